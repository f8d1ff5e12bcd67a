//! Canonical request construction

use std::collections::BTreeMap;

use curlkit_domain::HeaderList;
use url::Url;

/// Percent-decode then re-encode each path segment; `/` for an empty path
pub fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/')
        .map(|segment| {
            let decoded = urlencoding::decode_binary(segment.as_bytes());
            urlencoding::encode_binary(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Decoded query pairs, re-encoded and sorted by key then value
pub fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            (urlencoding::encode(&key).into_owned(), urlencoding::encode(&value).into_owned())
        })
        .collect();
    pairs.sort();
    pairs.into_iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
}

/// Canonical header block and the signed-header list
///
/// Names are lower-cased and sorted, values trimmed, repeated names joined
/// with `,`. `Authorization` is never signed.
pub fn canonical_headers(headers: &HeaderList) -> (String, String) {
    let mut grouped: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let name = name.trim().to_ascii_lowercase();
        if name == "authorization" {
            continue;
        }
        grouped.entry(name).or_default().push(value.trim());
    }

    let block: String =
        grouped.iter().map(|(name, values)| format!("{name}:{}\n", values.join(","))).collect();
    let signed = grouped.keys().cloned().collect::<Vec<_>>().join(";");
    (block, signed)
}
