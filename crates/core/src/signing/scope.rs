//! Region and service defaults taken from the target host
//!
//! Best effort only: hosts that do not follow the `service.region.domain`
//! convention get the first label as the service and the fixed fallback
//! region.

use curlkit_domain::constants::DEFAULT_SIGNING_REGION;
use once_cell::sync::Lazy;
use regex::Regex;

static REGION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2}(-gov)?-[a-z]+-\d+$").expect("REGION_LABEL pattern is valid")
});

fn is_region(label: &str) -> bool {
    REGION_LABEL.is_match(label)
}

/// First host label shaped like `xx-xxxx-n`, else the fallback region
pub fn region_from_host(host: &str) -> String {
    host.split('.')
        .find(|label| is_region(label))
        .unwrap_or(DEFAULT_SIGNING_REGION)
        .to_string()
}

/// First host label that is not a region
pub fn service_from_host(host: &str) -> Option<String> {
    host.split('.')
        .find(|label| !label.is_empty() && !is_region(label))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_region_labels() {
        assert_eq!(region_from_host("ec2.us-west-2.amazonaws.com"), "us-west-2");
        assert_eq!(region_from_host("s3.us-gov-west-1.amazonaws.com"), "us-gov-west-1");
        assert_eq!(region_from_host("bucket.s3.eu-central-1.amazonaws.com"), "eu-central-1");
    }

    #[test]
    fn falls_back_to_default_region() {
        assert_eq!(region_from_host("s3.amazonaws.com"), "us-east-1");
        assert_eq!(region_from_host("localhost"), "us-east-1");
        assert_eq!(region_from_host("storage.googleapis.com"), "us-east-1");
    }

    #[test]
    fn service_is_first_non_region_label() {
        assert_eq!(service_from_host("s3.amazonaws.com").as_deref(), Some("s3"));
        assert_eq!(service_from_host("us-east-1.lambda.example").as_deref(), Some("lambda"));
        assert_eq!(service_from_host("storage.googleapis.com").as_deref(), Some("storage"));
    }
}
