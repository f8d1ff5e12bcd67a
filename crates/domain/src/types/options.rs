//! Structured options parsed from a curl command line

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use curlkit_common::option_duration_millis;
use serde::{Deserialize, Serialize};

use super::{HeaderList, SigningConfig};

/// `-u user:password`
///
/// `Debug` masks the password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    /// Split `user:password` on the first colon; no colon means an empty
    /// password
    pub fn parse(value: &str) -> Self {
        match value.split_once(':') {
            Some((user, password)) => Self::new(user, password),
            None => Self::new(value, ""),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Value of one `-F` / `--form-string` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormValue {
    /// Literal text
    Text { value: String },
    /// `@path`: the file is attached as an upload part
    File { path: String, filename: Option<String>, content_type: Option<String> },
    /// `<path`: the file's contents become the field value
    FileContents { path: String, content_type: Option<String> },
}

/// One multipart field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: FormValue::Text { value: value.into() } }
    }
}

/// One data flag occurrence as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSegment {
    pub value: String,
    /// Placed before this value when it follows another one
    pub separator: String,
    /// Whether a leading `@` names a file
    pub resolve_file: bool,
}

/// Everything a curl command line says about one request
///
/// Built once by the parser and read-only afterwards. Every collection is
/// owned, so the derived `Clone` is a deep copy: editing a clone never shows
/// through to the original.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurlOptions {
    pub url: String,
    /// Explicit `-X`; see [`CurlOptions::effective_method`]
    pub method: Option<String>,
    pub headers: HeaderList,
    /// Lower-cased names emptied with `-H 'Name:'`, so no default is added
    #[serde(default)]
    pub suppressed_headers: BTreeSet<String>,

    /// Every data flag's value, joined with that flag's separator
    pub data: Option<String>,
    /// The occurrences behind `data`; empty when `data` was set directly
    #[serde(default)]
    pub data_segments: Vec<DataSegment>,
    /// `--data-raw`: never resolve `@file`
    pub raw_data: bool,
    /// `--json`: JSON headers and no separator between repeats
    pub json_data: bool,
    /// `--data-binary`
    pub binary_data: bool,
    pub form: Vec<FormField>,
    /// `-T`
    pub upload_file: Option<String>,
    /// `-G`: send data as the query string
    pub get_data: bool,
    /// `-I`
    pub head_only: bool,

    pub credentials: Option<Credentials>,
    pub proxy: Option<String>,
    pub signing: Option<SigningConfig>,

    pub follow_redirects: bool,
    pub max_redirects: Option<u32>,
    pub insecure: bool,
    pub verbose: bool,
    pub silent: bool,
    pub show_error: bool,
    pub include_headers: bool,
    pub compressed: bool,
    pub fail_on_http_error: bool,
    /// `--fail-with-body`: fail like `-f` but keep the body on the error
    pub fail_with_body: bool,

    #[serde(default, with = "option_duration_millis")]
    pub max_time: Option<Duration>,
    #[serde(default, with = "option_duration_millis")]
    pub connect_timeout: Option<Duration>,
    /// `--retry`: number of retries after the first attempt
    pub retry: Option<u32>,
    #[serde(default, with = "option_duration_millis")]
    pub retry_delay: Option<Duration>,
    #[serde(default, with = "option_duration_millis")]
    pub retry_max_time: Option<Duration>,

    pub output: Option<PathBuf>,

    pub binary_content_types: BTreeSet<String>,
    pub text_content_types: BTreeSet<String>,
    pub force_binary: bool,
}

impl CurlOptions {
    /// Options for a plain GET of `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// Whether the command carries a request body of any kind
    pub fn has_body(&self) -> bool {
        self.data.is_some() || !self.form.is_empty()
    }

    /// The method that goes on the wire
    ///
    /// An explicit `-X` always wins, wherever it appeared. Otherwise `-I`
    /// means HEAD, `-G` means GET, `-T` means PUT and any body means POST.
    pub fn effective_method(&self) -> String {
        if let Some(method) = &self.method {
            return method.clone();
        }
        let implied = if self.head_only {
            "HEAD"
        } else if self.get_data {
            "GET"
        } else if self.upload_file.is_some() {
            "PUT"
        } else if self.has_body() {
            "POST"
        } else {
            "GET"
        };
        implied.to_string()
    }

    /// Whether fail-on-error was requested by `-f` or `--fail-with-body`
    pub fn fails_on_http_error(&self) -> bool {
        self.fail_on_http_error || self.fail_with_body
    }

    pub fn is_signed(&self) -> bool {
        self.signing.is_some()
    }

    pub fn suppress_header(&mut self, name: &str) {
        self.suppressed_headers.insert(name.to_ascii_lowercase());
    }

    pub fn unsuppress_header(&mut self, name: &str) {
        self.suppressed_headers.remove(&name.to_ascii_lowercase());
    }

    /// Whether the command removed `name`, so no default may replace it
    pub fn suppresses_header(&self, name: &str) -> bool {
        self.suppressed_headers.contains(&name.to_ascii_lowercase())
    }

    /// Register a media type to always expose as bytes
    pub fn add_binary_content_type(&mut self, media_type: impl Into<String>) {
        self.binary_content_types.insert(media_type.into().to_ascii_lowercase());
    }

    /// Register a media type to always expose as text
    pub fn add_text_content_type(&mut self, media_type: impl Into<String>) {
        self.text_content_types.insert(media_type.into().to_ascii_lowercase());
    }
}
