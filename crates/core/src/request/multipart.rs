//! `multipart/form-data` encoding for `-F` fields
//!
//! Bodies are encoded in memory so signed requests can hash the complete
//! payload. File parts are copied byte for byte.

use curlkit_domain::constants::{CONTENT_TYPE_OCTET_STREAM, MULTIPART_BOUNDARY_PREFIX};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// One part with its content already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A random boundary in curl's style
pub fn generate_boundary() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(16).map(char::from).collect();
    format!("{MULTIPART_BOUNDARY_PREFIX}{suffix}")
}

/// Encode `parts` with `boundary`
pub fn encode(parts: &[Part], boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());

        let mut disposition =
            format!("Content-Disposition: form-data; name=\"{}\"", escape(&part.name));
        if let Some(filename) = &part.filename {
            disposition.push_str(&format!("; filename=\"{}\"", escape(filename)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");

        let content_type = part
            .content_type
            .as_deref()
            .or(part.filename.as_ref().map(|_| CONTENT_TYPE_OCTET_STREAM));
        if let Some(content_type) = content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }

        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
