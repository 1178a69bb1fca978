use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CameraConfig;
use crate::onvif::auth::UsernameToken;
use crate::onvif::soap::{self, SoapFault};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("SOAP fault: {0}")]
    Fault(SoapFault),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("{0} not found on device")]
    NotFound(String),
}

/// Connection to one camera, shared by the SOAP and web API adapters.
#[derive(Clone)]
pub struct CameraClient {
    config: CameraConfig,
    http_client: Client,
    auth: UsernameToken,
}

impl CameraClient {
    pub fn new(config: CameraConfig) -> Result<Self> {
        let auth = UsernameToken::new(config.username.clone(), config.password.clone());
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
            auth,
        })
    }

    /// Posts a SOAP request with a WS-Security header. A `Fault` in the
    /// response is returned as `ClientError::Fault` whatever the HTTP status.
    pub async fn send_soap_request(&self, service_path: &str, soap_body: &str) -> Result<String, ClientError> {
        let url = format!("{}{}", self.config.base_url(), service_path);
        let security_header = self.auth.security_header();
        let soap_request = soap::envelope(Some(&security_header), soap_body);

        tracing::trace!("Sending SOAP request to {}: {}", url, soap_request);

        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/soap+xml; charset=utf-8")
            .body(soap_request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        tracing::trace!("Received SOAP response from camera: {}", response_text);

        check_soap_response(status.as_u16(), response_text)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = format!("{}{}", self.config.base_url(), path);
        tracing::trace!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Malformed(format!("{}: {}", url, e)))
    }

    /// Returns the HTTP status of the write; only transport failures are errors.
    pub async fn put_json(&self, path: &str, payload: &serde_json::Value) -> Result<(u16, String), ClientError> {
        let url = format!("{}{}", self.config.base_url(), path);
        tracing::trace!("PUT {} {}", url, payload);

        let response = self
            .http_client
            .put(&url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(payload)
            .send()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport { url: url.clone(), source })?;

        Ok((status, body))
    }
}

/// Faults win over the HTTP status; a body that is not XML is `Malformed`.
fn check_soap_response(status: u16, response_text: String) -> Result<String, ClientError> {
    match SoapFault::detect(&response_text) {
        Ok(Some(fault)) => {
            tracing::debug!("Camera returned SOAP fault (HTTP {}): {}", status, fault);
            return Err(ClientError::Fault(fault));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::debug!("Unparseable SOAP response (HTTP {}): {}", status, e);
            return Err(ClientError::Malformed(format!("HTTP {}: {}", status, e)));
        }
    }

    if !(200..300).contains(&status) {
        tracing::warn!("Camera returned error status {}: {}", status, response_text);
        return Err(ClientError::Status {
            status,
            body: response_text,
        });
    }

    Ok(response_text)
}
