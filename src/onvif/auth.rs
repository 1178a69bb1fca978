use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Sha1, Digest};
use uuid::Uuid;
use chrono::Utc;

/// WS-Security UsernameToken credentials with password digest.
#[derive(Debug, Clone)]
pub struct UsernameToken {
    pub username: String,
    pub password: String,
}

impl UsernameToken {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Base64(SHA1(nonce + created + password))
    pub fn password_digest(nonce: &[u8], created: &str, password: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(nonce);
        hasher.update(created.as_bytes());
        hasher.update(password.as_bytes());
        BASE64.encode(hasher.finalize())
    }

    /// Builds a fresh `wsse:Security` header; every call gets a new nonce.
    pub fn security_header(&self) -> String {
        let nonce = Uuid::new_v4().as_bytes().to_vec();
        let created = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
        self.security_header_with(&nonce, &created)
    }

    fn security_header_with(&self, nonce: &[u8], created: &str) -> String {
        let digest = Self::password_digest(nonce, created, &self.password);

        format!(
            r#"<wsse:Security xmlns:wsse="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
  <wsse:UsernameToken>
    <wsse:Username>{}</wsse:Username>
    <wsse:Password Type="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest">{}</wsse:Password>
    <wsse:Nonce EncodingType="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary">{}</wsse:Nonce>
    <wsu:Created>{}</wsu:Created>
  </wsse:UsernameToken>
</wsse:Security>"#,
            crate::onvif::soap::escape(&self.username),
            digest,
            BASE64.encode(nonce),
            created
        )
    }
}
