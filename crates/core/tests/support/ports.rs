//! In-memory implementations of the core ports

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use curlkit_core::{FileSystem, PlannedRequest, RawResponse, Transport};
use curlkit_domain::{HeaderList, Result as DomainResult};

/// Transport that records every request and answers with a fixed response.
///
/// The reply body defaults to the request body, so tests can assert on the
/// exact bytes that would have gone over the wire.
#[derive(Clone, Default)]
pub struct EchoTransport {
    requests: Arc<Mutex<Vec<PlannedRequest>>>,
    reply: Option<(u16, Vec<(String, String)>, Vec<u8>)>,
}

impl EchoTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with this status, headers and body.
    pub fn replying(status: u16, headers: &[(&str, &str)], body: &[u8]) -> Self {
        let headers = headers.iter().map(|(n, v)| (n.to_string(), v.to_string())).collect();
        Self { requests: Arc::default(), reply: Some((status, headers, body.to_vec())) }
    }

    pub fn requests(&self) -> Vec<PlannedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> PlannedRequest {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: &PlannedRequest) -> DomainResult<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let (status, headers, body) = match &self.reply {
            Some((status, headers, body)) => {
                (*status, headers.iter().cloned().collect::<HeaderList>(), body.clone())
            }
            None => {
                let mut headers = HeaderList::new();
                headers.set("Content-Type", "application/octet-stream");
                (200, headers, request.body_bytes().to_vec())
            }
        };
        Ok(RawResponse { status, headers, url: request.url.to_string(), body })
    }
}

/// File system backed by a map; paths match exactly as written.
#[derive(Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFileSystem {
    pub fn with_file(self, path: &str, contents: &[u8]) -> Self {
        self.files.lock().unwrap().insert(PathBuf::from(path), contents.to_vec());
        self
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(Path::new(path)).cloned()
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "No such file or directory"))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        self.files.lock().unwrap().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
