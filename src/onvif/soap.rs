use quick_xml::events::Event;
use quick_xml::Reader;
use anyhow::Result;
use std::fmt;

pub const NS_ENVELOPE: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const NS_DEVICE: &str = "http://www.onvif.org/ver10/device/wsdl";
pub const NS_ANALYTICS: &str = "http://www.onvif.org/ver20/analytics/wsdl";
pub const NS_SCHEMA: &str = "http://www.onvif.org/ver10/schema";

/// Wraps a request body in a SOAP 1.2 envelope, with an optional
/// WS-Security header.
pub fn envelope(security_header: Option<&str>, body: &str) -> String {
    let header = match security_header {
        Some(security) => format!("<SOAP-ENV:Header>\n{}\n</SOAP-ENV:Header>\n", security),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP-ENV:Envelope xmlns:SOAP-ENV="{}" xmlns:tds="{}" xmlns:tan="{}" xmlns:tt="{}">
{}<SOAP-ENV:Body>
{}
</SOAP-ENV:Body>
</SOAP-ENV:Envelope>"#,
        NS_ENVELOPE, NS_DEVICE, NS_ANALYTICS, NS_SCHEMA, header, body
    )
}

/// A SOAP fault returned by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Most specific fault code (the innermost Subcode when present).
    pub code: String,
    pub reason: String,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reason.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.reason)
        }
    }
}

impl SoapFault {
    /// Looks for a `Fault` element anywhere in the response.
    pub fn detect(xml: &str) -> Result<Option<SoapFault>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut in_fault = false;
        let mut path: Vec<String> = Vec::new();
        let mut code = String::new();
        let mut reason = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if name == "Fault" {
                        in_fault = true;
                    }
                    if in_fault {
                        path.push(name);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if e.local_name().as_ref() == b"Fault" {
                        return Ok(Some(SoapFault {
                            code: String::new(),
                            reason: String::new(),
                        }));
                    }
                }
                Ok(Event::End(e)) => {
                    if in_fault {
                        path.pop();
                        if e.local_name().as_ref() == b"Fault" {
                            return Ok(Some(SoapFault { code, reason }));
                        }
                    }
                }
                Ok(Event::Text(e)) if in_fault => {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    match path.last().map(String::as_str) {
                        // Value under Code or any nested Subcode; the deepest wins.
                        Some("Value") if path.iter().any(|p| p == "Code") => code = text,
                        // SOAP 1.2 Reason/Text or SOAP 1.1 faultstring
                        Some("Text") | Some("faultstring") => {
                            if reason.is_empty() {
                                reason = text;
                            }
                        }
                        Some("faultcode") => code = text,
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(None)
    }
}

/// Local name of the first element inside the SOAP Body.
pub fn body_action(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut in_body = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = e.local_name();
                if in_body {
                    return Ok(Some(String::from_utf8_lossy(name.as_ref()).to_string()));
                }
                if name.as_ref() == b"Body" {
                    in_body = true;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Body parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(None)
}

/// Text of the first element with the given local name.
pub fn element_text(xml: &str, local_name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut capture = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                capture = e.local_name().as_ref() == local_name.as_bytes();
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == local_name.as_bytes() => {
                return Ok(Some(String::new()));
            }
            Ok(Event::Text(e)) if capture => {
                return Ok(Some(e.unescape().unwrap_or_default().to_string()));
            }
            Ok(Event::End(_)) => {
                if capture {
                    return Ok(Some(String::new()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(None)
}

pub fn escape(value: &str) -> String {
    quick_xml::escape::escape(value).into_owned()
}
