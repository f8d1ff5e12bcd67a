//! Options → wire request
//!
//! The planner is the only stage that touches local files before
//! transmission: `@file` data, `-F` file parts and `-T` uploads are read
//! here as raw bytes. Any failure surfaces before a connection is opened.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use curlkit_domain::constants::{
    CONTENT_TYPE_FORM, CONTENT_TYPE_MULTIPART, DEFAULT_SCHEME, HEADER_ACCEPT, HEADER_AUTHORIZATION,
    HEADER_CONTENT_TYPE, HEADER_USER_AGENT,
};
use curlkit_domain::{CurlError, CurlOptions, ExecutionConfig, FormValue, HeaderList, Result};
use tracing::debug;
use url::Url;

use super::multipart::{self, Part};
use crate::ports::{FileSystem, PlannedRequest, TransportSettings};

/// Builds [`PlannedRequest`]s from parsed options
#[derive(Clone)]
pub struct RequestPlanner {
    fs: Arc<dyn FileSystem>,
    config: Arc<ExecutionConfig>,
}

impl RequestPlanner {
    pub fn new(fs: Arc<dyn FileSystem>, config: Arc<ExecutionConfig>) -> Self {
        Self { fs, config }
    }

    /// Resolve every file reference and produce the request to send
    ///
    /// # Errors
    ///
    /// - [`CurlError::InvalidUrl`] if the URL cannot be parsed or is not HTTP(S)
    /// - [`CurlError::FileUnreadable`] with the path exactly as written
    /// - [`CurlError::MalformedCommand`] when `-d` and `-F` are combined
    pub async fn plan(&self, options: &CurlOptions) -> Result<PlannedRequest> {
        let mut url = parse_url(&options.url)?;
        let mut headers = options.headers.clone();
        let method = options.effective_method();

        if options.data.is_some() && !options.form.is_empty() {
            return Err(CurlError::malformed("-F", "form fields cannot be combined with -d"));
        }

        let mut body = None;
        if let Some(data) = self.resolve_data(options).await? {
            if options.get_data {
                append_query(&mut url, &String::from_utf8_lossy(&data));
            } else {
                if !options.json_data {
                    set_default(&mut headers, options, HEADER_CONTENT_TYPE, CONTENT_TYPE_FORM);
                }
                body = Some(data);
            }
        } else if !options.form.is_empty() {
            let parts = self.resolve_form(options).await?;
            let boundary = multipart::generate_boundary();
            let content_type = match headers.get(HEADER_CONTENT_TYPE) {
                Some(existing) if existing.contains("boundary=") => existing.to_string(),
                Some(existing) => format!("{existing}; boundary={boundary}"),
                None => format!("{CONTENT_TYPE_MULTIPART}; boundary={boundary}"),
            };
            headers.set(HEADER_CONTENT_TYPE, content_type);
            body = Some(multipart::encode(&parts, &boundary));
        } else if let Some(upload) = &options.upload_file {
            body = Some(self.read(upload).await?);
            append_upload_name(&mut url, upload);
        }

        if let Some(credentials) = &options.credentials {
            if !options.is_signed() && !headers.contains(HEADER_AUTHORIZATION) {
                let token =
                    BASE64.encode(format!("{}:{}", credentials.username, credentials.password));
                headers.set(HEADER_AUTHORIZATION, format!("Basic {token}"));
            }
        }
        set_default(&mut headers, options, HEADER_USER_AGENT, &self.config.http.user_agent);
        set_default(&mut headers, options, HEADER_ACCEPT, "*/*");

        if options.head_only {
            body = None;
        }

        let settings = TransportSettings {
            follow_redirects: options.follow_redirects,
            max_redirects: options.max_redirects.unwrap_or(self.config.http.max_redirects),
            insecure: options.insecure || self.config.http.insecure,
            proxy: options.proxy.clone(),
            connect_timeout: options
                .connect_timeout
                .filter(|limit| !limit.is_zero())
                .unwrap_or(self.config.http.connect_timeout),
            compressed: options.compressed,
        };

        debug!(
            %method,
            url = %url,
            body_len = body.as_ref().map_or(0, Vec::len),
            "planned request"
        );

        Ok(PlannedRequest {
            method,
            url,
            headers,
            body,
            settings,
            timeout: attempt_timeout(options, &self.config),
        })
    }

    /// The request body from `-d`/`--json`/`--data-binary`
    ///
    /// Each occurrence with a leading `@` is read as a file unless it came
    /// from `--data-raw`; the results are joined with their separators.
    /// Options built by hand carry no segments, so the whole `data` value is
    /// checked instead.
    async fn resolve_data(&self, options: &CurlOptions) -> Result<Option<Vec<u8>>> {
        let Some(data) = &options.data else {
            return Ok(None);
        };
        if options.data_segments.is_empty() {
            return match data.strip_prefix('@') {
                Some(path) if !options.raw_data => self.read(path).await.map(Some),
                _ => Ok(Some(data.clone().into_bytes())),
            };
        }

        let mut body = Vec::with_capacity(data.len());
        for (index, segment) in options.data_segments.iter().enumerate() {
            if index > 0 {
                body.extend_from_slice(segment.separator.as_bytes());
            }
            match segment.value.strip_prefix('@') {
                Some(path) if segment.resolve_file => body.extend(self.read(path).await?),
                _ => body.extend_from_slice(segment.value.as_bytes()),
            }
        }
        Ok(Some(body))
    }

    async fn resolve_form(&self, options: &CurlOptions) -> Result<Vec<Part>> {
        let mut parts = Vec::with_capacity(options.form.len());
        for field in &options.form {
            let part = match &field.value {
                FormValue::Text { value } => Part {
                    name: field.name.clone(),
                    filename: None,
                    content_type: None,
                    data: value.clone().into_bytes(),
                },
                FormValue::File { path, filename, content_type } => Part {
                    name: field.name.clone(),
                    filename: Some(filename.clone().unwrap_or_else(|| file_name(path))),
                    content_type: content_type.clone(),
                    data: self.read(path).await?,
                },
                FormValue::FileContents { path, content_type } => Part {
                    name: field.name.clone(),
                    filename: None,
                    content_type: content_type.clone(),
                    data: self.read(path).await?,
                },
            };
            parts.push(part);
        }
        Ok(parts)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.fs.read(Path::new(path)).await.map_err(|err| {
            debug!(path, error = %err, "failed to read referenced file");
            CurlError::file_unreadable(path, &err)
        })
    }
}

impl std::fmt::Debug for RequestPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPlanner").field("config", &self.config).finish_non_exhaustive()
    }
}

/// Parse the command's URL, adding `http://` when no scheme is given
pub fn parse_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{DEFAULT_SCHEME}{trimmed}")
    };

    let url = Url::parse(&candidate).map_err(|_| CurlError::InvalidUrl { url: raw.to_string() })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(CurlError::InvalidUrl { url: raw.to_string() });
    }
    Ok(url)
}

/// A `scheme://` prefix before any path, query or fragment
fn has_scheme(url: &str) -> bool {
    let Some((scheme, _)) = url.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Add a default header unless the command set or removed it
fn set_default(headers: &mut HeaderList, options: &CurlOptions, name: &str, value: &str) {
    if !options.suppresses_header(name) {
        headers.set_if_absent(name, value);
    }
}

fn append_query(url: &mut Url, data: &str) {
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{existing}&{data}"),
        _ => data.to_string(),
    };
    url.set_query(Some(&query));
}

/// `-T file` against a URL ending in `/` uploads to that directory under the
/// file's own name
fn append_upload_name(url: &mut Url, upload: &str) {
    if url.path().ends_with('/') {
        let path = format!("{}{}", url.path(), urlencoding::encode(&file_name(upload)));
        url.set_path(&path);
    }
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |name| name.to_string_lossy().into_owned())
}

/// Per-attempt transport timeout: `-m` bounds the whole exchange, so a single
/// attempt never needs longer than that. Zero means no limit.
fn attempt_timeout(options: &CurlOptions, config: &ExecutionConfig) -> Option<Duration> {
    options.max_time.filter(|limit| !limit.is_zero()).or(config.http.timeout)
}
