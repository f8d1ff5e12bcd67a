//! Static flag table
//!
//! Each entry lists every spelling of a flag and the action applied to the
//! options being built. The table is indexed once into a map keyed by
//! spelling (`-d`, `--data`, ...), so lookups during parsing are a single
//! hash probe.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use curlkit_domain::constants::{
    CONTENT_TYPE_JSON, HEADER_ACCEPT, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE, HEADER_COOKIE,
    HEADER_REFERER, HEADER_USER_AGENT,
};
use curlkit_domain::{
    Credentials, CurlError, CurlOptions, DataSegment, FormField, FormValue, Result,
    SigningConfig,
};
use once_cell::sync::Lazy;

/// What a flag does when it is seen
#[derive(Clone, Copy)]
pub enum FlagAction {
    /// Takes no value
    Switch(fn(&mut CurlOptions)),
    /// Takes exactly one value
    Value(fn(&mut CurlOptions, &str) -> Result<()>),
}

impl FlagAction {
    pub fn takes_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

/// One row of the flag table
#[derive(Clone, Copy)]
pub struct FlagSpec {
    /// Long spelling including the leading dashes
    pub long: &'static str,
    pub short: Option<char>,
    /// Extra long spellings accepted for the same flag
    pub aliases: &'static [&'static str],
    pub action: FlagAction,
}

impl std::fmt::Debug for FlagSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagSpec")
            .field("long", &self.long)
            .field("short", &self.short)
            .field("takes_value", &self.action.takes_value())
            .finish()
    }
}

const fn switch(
    long: &'static str,
    short: Option<char>,
    apply: fn(&mut CurlOptions),
) -> FlagSpec {
    FlagSpec { long, short, aliases: &[], action: FlagAction::Switch(apply) }
}

const fn value(
    long: &'static str,
    short: Option<char>,
    apply: fn(&mut CurlOptions, &str) -> Result<()>,
) -> FlagSpec {
    FlagSpec { long, short, aliases: &[], action: FlagAction::Value(apply) }
}

static FLAGS: &[FlagSpec] = &[
    // Request line and headers
    value("--request", Some('X'), |o, v| {
        o.method = Some(v.to_string());
        Ok(())
    }),
    value("--url", None, |o, v| {
        if !o.url.is_empty() {
            return Err(CurlError::malformed(v, "only one URL is supported"));
        }
        o.url = v.to_string();
        Ok(())
    }),
    value("--header", Some('H'), apply_header),
    value("--user-agent", Some('A'), |o, v| {
        set_or_remove(o, HEADER_USER_AGENT, v);
        Ok(())
    }),
    value("--referer", Some('e'), |o, v| {
        set_or_remove(o, HEADER_REFERER, v);
        Ok(())
    }),
    value("--cookie", Some('b'), apply_cookie),
    // Bodies
    FlagSpec {
        long: "--data",
        short: Some('d'),
        aliases: &["--data-ascii"],
        action: FlagAction::Value(|o, v| {
            append_data(o, v, "&", true);
            Ok(())
        }),
    },
    value("--data-binary", None, |o, v| {
        o.binary_data = true;
        append_data(o, v, "&", true);
        Ok(())
    }),
    value("--data-raw", None, |o, v| {
        o.raw_data = true;
        append_data(o, v, "", false);
        Ok(())
    }),
    value("--data-urlencode", None, |o, v| {
        append_data(o, &url_encode_data(v), "&", false);
        Ok(())
    }),
    value("--json", None, |o, v| {
        o.json_data = true;
        append_data(o, v, "", true);
        o.headers.set(HEADER_CONTENT_TYPE, CONTENT_TYPE_JSON);
        o.headers.set(HEADER_ACCEPT, CONTENT_TYPE_JSON);
        Ok(())
    }),
    value("--form", Some('F'), |o, v| {
        o.form.push(parse_form_field(v)?);
        Ok(())
    }),
    value("--form-string", None, |o, v| {
        let (name, text) = split_form_field(v)?;
        o.form.push(FormField::text(name, text));
        Ok(())
    }),
    value("--upload-file", Some('T'), |o, v| {
        o.upload_file = Some(v.to_string());
        Ok(())
    }),
    switch("--get", Some('G'), |o| o.get_data = true),
    switch("--head", Some('I'), |o| o.head_only = true),
    // Authentication
    value("--user", Some('u'), |o, v| {
        o.credentials = Some(Credentials::parse(v));
        Ok(())
    }),
    value("--oauth2-bearer", None, |o, v| {
        o.headers.set(HEADER_AUTHORIZATION, format!("Bearer {v}"));
        Ok(())
    }),
    value("--aws-sigv4", None, |o, v| {
        o.signing = Some(SigningConfig::parse(v)?);
        Ok(())
    }),
    // Connection behaviour
    value("--proxy", Some('x'), |o, v| {
        o.proxy = Some(v.to_string());
        Ok(())
    }),
    switch("--location", Some('L'), |o| o.follow_redirects = true),
    value("--max-redirs", None, |o, v| {
        let limit = parse_integer::<i64>("--max-redirs", v)?;
        o.max_redirects = Some(u32::try_from(limit).unwrap_or(u32::MAX));
        Ok(())
    }),
    switch("--insecure", Some('k'), |o| o.insecure = true),
    switch("--compressed", None, |o| o.compressed = true),
    value("--max-time", Some('m'), |o, v| {
        o.max_time = parse_limit("--max-time", v)?;
        Ok(())
    }),
    value("--connect-timeout", None, |o, v| {
        o.connect_timeout = parse_limit("--connect-timeout", v)?;
        Ok(())
    }),
    value("--retry", None, |o, v| {
        o.retry = Some(parse_integer("--retry", v)?);
        Ok(())
    }),
    value("--retry-delay", None, |o, v| {
        o.retry_delay = Some(parse_seconds("--retry-delay", v)?);
        Ok(())
    }),
    value("--retry-max-time", None, |o, v| {
        o.retry_max_time = Some(parse_seconds("--retry-max-time", v)?);
        Ok(())
    }),
    // Output and error reporting
    switch("--verbose", Some('v'), |o| o.verbose = true),
    switch("--silent", Some('s'), |o| o.silent = true),
    switch("--show-error", Some('S'), |o| o.show_error = true),
    switch("--include", Some('i'), |o| o.include_headers = true),
    switch("--fail", Some('f'), |o| o.fail_on_http_error = true),
    switch("--fail-with-body", None, |o| o.fail_with_body = true),
    value("--output", Some('o'), |o, v| {
        o.output = Some(PathBuf::from(v));
        Ok(())
    }),
];

static INDEX: Lazy<HashMap<String, &'static FlagSpec>> = Lazy::new(|| {
    let mut index = HashMap::new();
    for spec in FLAGS {
        index.insert(spec.long.to_string(), spec);
        for alias in spec.aliases {
            index.insert((*alias).to_string(), spec);
        }
        if let Some(short) = spec.short {
            index.insert(format!("-{short}"), spec);
        }
    }
    index
});

/// Look up a flag by any of its spellings (`-d`, `--data`, `--data-ascii`)
pub fn lookup(spelling: &str) -> Option<&'static FlagSpec> {
    INDEX.get(spelling).copied()
}

/// Every flag in the table
pub fn all() -> &'static [FlagSpec] {
    FLAGS
}

/// Extend the joined data text and record the occurrence, so `@file` is
/// later resolved per flag rather than on the joined string
fn append_data(options: &mut CurlOptions, value: &str, separator: &str, resolve_file: bool) {
    match &mut options.data {
        Some(existing) => {
            existing.push_str(separator);
            existing.push_str(value);
        }
        None => options.data = Some(value.to_string()),
    }
    options.data_segments.push(DataSegment {
        value: value.to_string(),
        separator: separator.to_string(),
        resolve_file,
    });
}

fn set_or_remove(options: &mut CurlOptions, name: &str, value: &str) {
    if value.is_empty() {
        options.headers.remove(name);
        options.suppress_header(name);
    } else {
        options.headers.set(name, value);
        options.unsuppress_header(name);
    }
}

/// `Name: value` sets, `Name:` removes, `Name;` sets an empty value
fn apply_header(options: &mut CurlOptions, line: &str) -> Result<()> {
    if let Some((name, value)) = line.split_once(':') {
        let name = name.trim();
        if name.is_empty() {
            return Err(CurlError::malformed(line, "header name is empty"));
        }
        set_or_remove(options, name, value.trim());
        return Ok(());
    }

    match line.trim().strip_suffix(';') {
        Some(name) if !name.trim().is_empty() => {
            options.headers.set(name.trim(), "");
            Ok(())
        }
        _ => Err(CurlError::malformed(line, "expected 'Name: value'")),
    }
}

fn apply_cookie(options: &mut CurlOptions, value: &str) -> Result<()> {
    if !value.contains('=') {
        return Err(CurlError::malformed(value, "cookie files are not supported"));
    }
    options.headers.set(HEADER_COOKIE, value);
    Ok(())
}

/// `content`, `=content` and `name=content` forms of `--data-urlencode`
fn url_encode_data(value: &str) -> String {
    match value.split_once('=') {
        Some(("", content)) => urlencoding::encode(content).into_owned(),
        Some((name, content)) => format!("{name}={}", urlencoding::encode(content)),
        None => urlencoding::encode(value).into_owned(),
    }
}

fn split_form_field(value: &str) -> Result<(&str, &str)> {
    match value.split_once('=') {
        Some((name, content)) if !name.is_empty() => Ok((name, content)),
        _ => Err(CurlError::malformed(value, "form field must be 'name=content'")),
    }
}

/// `name=text`, `name=@path[;type=..][;filename=..]` or `name=<path[;type=..]`
fn parse_form_field(value: &str) -> Result<FormField> {
    let (name, content) = split_form_field(value)?;

    let field_value = if let Some(spec) = content.strip_prefix('@') {
        let mut parts = spec.split(';');
        let path = parts.next().unwrap_or_default().to_string();
        let mut filename = None;
        let mut content_type = None;
        for part in parts {
            match part.split_once('=') {
                Some(("type", media_type)) => content_type = Some(media_type.to_string()),
                Some(("filename", name)) => filename = Some(name.to_string()),
                _ => return Err(CurlError::malformed(value, "unknown form field parameter")),
            }
        }
        FormValue::File { path, filename, content_type }
    } else if let Some(spec) = content.strip_prefix('<') {
        let (path, content_type) = match spec.split_once(";type=") {
            Some((path, media_type)) => (path, Some(media_type.to_string())),
            None => (spec, None),
        };
        FormValue::FileContents { path: path.to_string(), content_type }
    } else {
        FormValue::Text { value: content.to_string() }
    };

    Ok(FormField { name: name.to_string(), value: field_value })
}

fn parse_integer<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CurlError::malformed(format!("{flag} {value}"), "expected a whole number"))
}

/// Seconds, possibly fractional, as curl accepts them for timeouts
fn parse_seconds(flag: &str, value: &str) -> Result<Duration> {
    let invalid =
        || CurlError::malformed(format!("{flag} {value}"), "expected a number of seconds");
    let seconds: f64 = value.trim().parse().map_err(|_| invalid())?;
    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}

/// `-m` and `--connect-timeout`: zero means no limit
fn parse_limit(flag: &str, value: &str) -> Result<Option<Duration>> {
    let limit = parse_seconds(flag, value)?;
    Ok((!limit.is_zero()).then_some(limit))
}
