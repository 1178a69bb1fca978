use crate::camera::{CameraClient, ClientError};
use crate::onvif::soap::element_text;
use crate::onvif::types::DeviceInformation;

pub struct DeviceService;

impl DeviceService {
    pub async fn get_device_information(camera: &CameraClient, service_path: &str) -> Result<DeviceInformation, ClientError> {
        let request_body = r#"<tds:GetDeviceInformation/>"#;

        let response = camera
            .send_soap_request(service_path, request_body)
            .await?;

        Self::parse_device_information(&response)
    }

    pub async fn system_reboot(camera: &CameraClient, service_path: &str) -> Result<String, ClientError> {
        let request_body = r#"<tds:SystemReboot/>"#;

        let response = camera
            .send_soap_request(service_path, request_body)
            .await?;

        let message = element_text(&response, "Message")
            .map_err(|e| ClientError::Malformed(e.to_string()))?
            .unwrap_or_default();

        Ok(message)
    }

    /// Soft reset only; a hard reset would also drop the network settings
    /// and the camera could come back on another address.
    pub async fn set_system_factory_default(camera: &CameraClient, service_path: &str) -> Result<(), ClientError> {
        let request_body = r#"<tds:SetSystemFactoryDefault><tds:FactoryDefault>Soft</tds:FactoryDefault></tds:SetSystemFactoryDefault>"#;

        camera.send_soap_request(service_path, request_body).await?;

        Ok(())
    }

    fn parse_device_information(xml: &str) -> Result<DeviceInformation, ClientError> {
        let field = |name: &str| -> Result<String, ClientError> {
            Ok(element_text(xml, name)
                .map_err(|e| ClientError::Malformed(e.to_string()))?
                .unwrap_or_default())
        };

        let info = DeviceInformation {
            manufacturer: field("Manufacturer")?,
            model: field("Model")?,
            firmware_version: field("FirmwareVersion")?,
            serial_number: field("SerialNumber")?,
            hardware_id: field("HardwareId")?,
        };

        if info.model.is_empty() && info.hardware_id.is_empty() {
            return Err(ClientError::Malformed(
                "GetDeviceInformationResponse without Model or HardwareId".to_string(),
            ));
        }

        Ok(info)
    }
}
