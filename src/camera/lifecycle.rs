use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::accessor::{AccessError, DeviceLifecycle};
use crate::camera::CameraClient;
use crate::config::LifecycleConfig;
use crate::onvif::device::DeviceService;

/// Reboot and factory reset over the ONVIF device service.
///
/// After the request is accepted the device is given `shutdown_grace` to go
/// down, then `GetDeviceInformation` is polled every `poll_interval` until it
/// answers or `ready_timeout` runs out.
pub struct OnvifLifecycle {
    camera: CameraClient,
    device_service: String,
    timing: LifecycleConfig,
}

impl OnvifLifecycle {
    pub fn new(camera: CameraClient, device_service: impl Into<String>, timing: LifecycleConfig) -> Self {
        Self {
            camera,
            device_service: device_service.into(),
            timing,
        }
    }

    async fn wait_for_ready(&self) -> Result<(), AccessError> {
        sleep(self.timing.shutdown_grace()).await;

        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match DeviceService::get_device_information(&self.camera, &self.device_service).await {
                Ok(info) => {
                    tracing::info!(
                        "Camera {} ({}) is back after {:?}, {} poll(s)",
                        info.model,
                        info.firmware_version,
                        started.elapsed(),
                        attempts
                    );
                    sleep(self.timing.settle()).await;
                    return Ok(());
                }
                Err(e) => tracing::debug!("Camera not ready yet: {}", e),
            }

            if started.elapsed() >= self.timing.ready_timeout() {
                tracing::error!("Camera did not come back within {:?}", self.timing.ready_timeout());
                return Err(AccessError::NotReady(self.timing.ready_timeout()));
            }
            sleep(self.timing.poll_interval()).await;
        }
    }
}

#[async_trait]
impl DeviceLifecycle for OnvifLifecycle {
    async fn reboot(&self) -> Result<(), AccessError> {
        let message = DeviceService::system_reboot(&self.camera, &self.device_service).await?;
        tracing::info!("Reboot requested: {}", if message.is_empty() { "no message" } else { &message });

        self.wait_for_ready().await
    }

    async fn restore_factory_defaults(&self) -> Result<(), AccessError> {
        DeviceService::set_system_factory_default(&self.camera, &self.device_service).await?;
        tracing::info!("Factory defaults requested");

        self.wait_for_ready().await
    }
}
