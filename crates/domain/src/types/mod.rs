//! Domain types and models

pub mod headers;
pub mod options;
pub mod response;
pub mod signing;

pub use headers::HeaderList;
pub use options::{Credentials, CurlOptions, DataSegment, FormField, FormValue};
pub use response::{CurlResponse, ResponseBody};
pub use signing::SigningConfig;
