//! Executed exchange results

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::HeaderList;
use crate::constants::HEADER_CONTENT_TYPE;

/// Response body, exposed as exactly one of text or bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ResponseBody {
    Text(String),
    Binary(Vec<u8>),
}

impl ResponseBody {
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    pub fn binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            Self::Text(_) => None,
        }
    }

    /// The body's bytes regardless of how it was classified
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::Binary(Vec::new())
    }
}

/// Outcome of one executed command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurlResponse {
    pub status: u16,
    pub headers: HeaderList,
    /// URL of the final response, after any redirects
    pub url: String,
    #[serde(with = "curlkit_common::duration_millis")]
    pub elapsed: Duration,
    pub body: ResponseBody,
}

impl CurlResponse {
    pub fn is_binary(&self) -> bool {
        self.body.is_binary()
    }

    pub fn text_body(&self) -> Option<&str> {
        self.body.text()
    }

    pub fn binary_body(&self) -> Option<&[u8]> {
        self.body.binary()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(HEADER_CONTENT_TYPE)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
