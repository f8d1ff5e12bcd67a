//! Binary/text classification of response bodies
//!
//! Misreading text as binary loses nothing; misreading binary as text can
//! corrupt it. Every uncertain case therefore falls to binary, and a body
//! classified as text is still kept as bytes if it is not valid UTF-8.

use std::collections::BTreeSet;
use std::time::Duration;

use curlkit_domain::constants::HEADER_CONTENT_TYPE;
use curlkit_domain::{CurlOptions, CurlResponse, ResponseBody};
use tracing::trace;

use crate::ports::RawResponse;

/// How a body should be exposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Text,
    Binary,
}

/// `application/*` subtypes that are textual
const TEXT_APPLICATION_SUBTYPES: &[&str] = &[
    "javascript",
    "x-javascript",
    "ecmascript",
    "x-www-form-urlencoded",
    "yaml",
    "x-yaml",
    "graphql",
    "csv",
    "x-ndjson",
    "ndjson",
    "x-json",
    "x-sh",
    "sql",
];

/// `application/*` subtypes that are binary
const BINARY_APPLICATION_SUBTYPES: &[&str] = &[
    "octet-stream",
    "pdf",
    "zip",
    "gzip",
    "x-gzip",
    "x-tar",
    "x-bzip2",
    "x-xz",
    "zstd",
    "x-7z-compressed",
    "x-rar-compressed",
    "vnd.rar",
    "java-archive",
    "msword",
    "vnd.ms-excel",
    "vnd.ms-powerpoint",
    "wasm",
    "protobuf",
    "x-protobuf",
    "vnd.google.protobuf",
    "x-msdownload",
    "vnd.android.package-archive",
    "font-woff",
    "x-font-ttf",
];

/// Caller overrides plus the `force_binary` switch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationRules {
    pub force_binary: bool,
    pub binary_types: BTreeSet<String>,
    pub text_types: BTreeSet<String>,
}

impl ClassificationRules {
    pub fn from_options(options: &CurlOptions) -> Self {
        Self {
            force_binary: options.force_binary,
            binary_types: options.binary_content_types.clone(),
            text_types: options.text_content_types.clone(),
        }
    }

    /// Decide how a body with this `Content-Type` header is exposed
    pub fn kind_for(&self, content_type: Option<&str>) -> BodyKind {
        if self.force_binary {
            return BodyKind::Binary;
        }
        let Some(content_type) = content_type else {
            return BodyKind::Binary;
        };

        let media = MediaType::parse(content_type);
        if matches_any(&self.binary_types, &media.essence) {
            return BodyKind::Binary;
        }
        if matches_any(&self.text_types, &media.essence) {
            return BodyKind::Text;
        }
        builtin_kind(&media)
    }

    /// Build the body, keeping bytes whenever text decoding would lose them
    pub fn body_for(&self, content_type: Option<&str>, bytes: Vec<u8>) -> ResponseBody {
        match self.kind_for(content_type) {
            BodyKind::Binary => ResponseBody::Binary(bytes),
            BodyKind::Text => match String::from_utf8(bytes) {
                Ok(text) => ResponseBody::Text(text),
                Err(err) => {
                    trace!("text body is not valid UTF-8, keeping bytes");
                    ResponseBody::Binary(err.into_bytes())
                }
            },
        }
    }

    /// Turn a raw transport response into the caller-facing result
    pub fn classify(&self, raw: RawResponse, elapsed: Duration) -> CurlResponse {
        let body = self.body_for(raw.headers.get(HEADER_CONTENT_TYPE), raw.body);
        CurlResponse { status: raw.status, headers: raw.headers, url: raw.url, elapsed, body }
    }
}

struct MediaType {
    /// `type/subtype`, lower-cased, parameters stripped
    essence: String,
    has_charset: bool,
}

impl MediaType {
    fn parse(header: &str) -> Self {
        let mut pieces = header.split(';');
        let essence = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
        let has_charset = pieces.any(|param| {
            let name = param.split('=').next().unwrap_or_default();
            name.trim().eq_ignore_ascii_case("charset")
        });
        Self { essence, has_charset }
    }
}

/// Exact essence match or a `type/*` wildcard
fn matches_any(patterns: &BTreeSet<String>, essence: &str) -> bool {
    patterns.iter().any(|pattern| {
        let pattern = pattern.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match pattern.strip_suffix("/*") {
            Some(top) => essence.split('/').next() == Some(top),
            None => pattern == essence,
        }
    })
}

fn builtin_kind(media: &MediaType) -> BodyKind {
    let essence = media.essence.as_str();
    // Office Open XML documents are zip archives despite the "xml" in the name.
    if essence.contains("openxmlformats-officedocument") {
        return BodyKind::Binary;
    }

    let Some((top, subtype)) = essence.split_once('/') else {
        return fallback(media);
    };

    if top == "text" {
        return BodyKind::Text;
    }
    if matches!(subtype, "xml" | "json") || subtype.ends_with("+xml") || subtype.ends_with("+json")
    {
        return BodyKind::Text;
    }
    if top == "application" && TEXT_APPLICATION_SUBTYPES.contains(&subtype) {
        return BodyKind::Text;
    }
    if matches!(top, "image" | "audio" | "video" | "font") {
        return BodyKind::Binary;
    }
    if top == "application" && BINARY_APPLICATION_SUBTYPES.contains(&subtype) {
        return BodyKind::Binary;
    }
    fallback(media)
}

/// Unknown types are text only when they declare a charset
fn fallback(media: &MediaType) -> BodyKind {
    if media.has_charset {
        BodyKind::Text
    } else {
        BodyKind::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(content_type: &str) -> BodyKind {
        ClassificationRules::default().kind_for(Some(content_type))
    }

    #[test]
    fn office_open_xml_is_binary_despite_xml() {
        assert_eq!(
            kind("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
            BodyKind::Binary
        );
        assert_eq!(
            kind("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            BodyKind::Binary
        );
    }

    #[test]
    fn structured_xml_and_json_are_text() {
        for media_type in [
            "application/xml",
            "application/soap+xml",
            "application/json",
            "application/vnd.api+json",
            "application/problem+json; charset=utf-8",
            "image/svg+xml",
            "text/xml",
            "TEXT/HTML; Charset=ISO-8859-1",
        ] {
            assert_eq!(kind(media_type), BodyKind::Text, "{media_type}");
        }
    }

    #[test]
    fn media_and_archives_are_binary() {
        for media_type in [
            "image/png",
            "audio/mpeg",
            "video/mp4",
            "font/woff2",
            "application/pdf",
            "application/zip",
            "application/msword",
            "application/octet-stream",
            "application/wasm",
        ] {
            assert_eq!(kind(media_type), BodyKind::Binary, "{media_type}");
        }
    }

    #[test]
    fn unknown_types_depend_on_charset() {
        assert_eq!(kind("application/x-custom"), BodyKind::Binary);
        assert_eq!(kind("application/x-custom; charset=utf-8"), BodyKind::Text);
        assert_eq!(kind("garbage"), BodyKind::Binary);
    }

    #[test]
    fn absent_content_type_is_binary() {
        assert_eq!(ClassificationRules::default().kind_for(None), BodyKind::Binary);
    }

    #[test]
    fn force_binary_beats_everything() {
        let rules = ClassificationRules {
            force_binary: true,
            text_types: ["application/json".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(rules.kind_for(Some("application/json")), BodyKind::Binary);
        assert_eq!(rules.kind_for(Some("text/plain")), BodyKind::Binary);
    }

    #[test]
    fn binary_overrides_dominate_text_overrides() {
        let rules = ClassificationRules {
            binary_types: ["application/x-both".to_string()].into(),
            text_types: ["application/x-both".to_string(), "image/*".to_string()].into(),
            ..Default::default()
        };

        assert_eq!(rules.kind_for(Some("application/x-both")), BodyKind::Binary);
        assert_eq!(rules.kind_for(Some("image/x-portable-pixmap")), BodyKind::Text);
        assert_eq!(rules.kind_for(Some("IMAGE/PNG")), BodyKind::Text);
    }

    #[test]
    fn overrides_beat_builtin_table() {
        let rules = ClassificationRules {
            binary_types: ["application/json".to_string()].into(),
            ..Default::default()
        };
        assert_eq!(rules.kind_for(Some("application/json; charset=utf-8")), BodyKind::Binary);
    }

    #[test]
    fn invalid_utf8_text_is_kept_as_bytes() {
        let rules = ClassificationRules::default();
        let bytes = vec![b'o', b'k', 0xFF, 0xFE];

        assert_eq!(
            rules.body_for(Some("text/plain"), bytes.clone()),
            ResponseBody::Binary(bytes)
        );
        assert_eq!(
            rules.body_for(Some("text/plain"), b"fine".to_vec()),
            ResponseBody::Text("fine".into())
        );
    }

    #[test]
    fn every_byte_value_survives_binary_classification() {
        let all: Vec<u8> = (0..=255u8).collect();
        let raw = RawResponse {
            status: 200,
            headers: [("Content-Type", "application/octet-stream")].into_iter().collect(),
            url: "http://x/".into(),
            body: all.clone(),
        };

        let response = ClassificationRules::default().classify(raw, Duration::ZERO);
        assert_eq!(response.binary_body(), Some(all.as_slice()));
        assert!(response.text_body().is_none());
    }
}
