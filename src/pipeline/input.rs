//! Input stage: the uploaded PDF as an owned byte buffer.
//!
//! pdfium can open a document straight from a byte slice, so the resume is
//! never written to disk. [`load_document`] is the adapter used by the CLI to
//! turn a path or URL into [`DocumentBytes`]; library callers that already
//! hold the upload in memory use [`DocumentBytes::from_vec`].

use crate::error::AtsError;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Magic bytes of the PDF header.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// How far into the file the header may start. Readers accept junk such as
/// a BOM or stray newlines before it.
pub const PDF_HEADER_WINDOW: usize = 1024;

/// Raw bytes of an uploaded PDF, owned for the duration of one request.
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentBytes(Vec<u8>);

impl DocumentBytes {
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `%PDF` starts within the first [`PDF_HEADER_WINDOW`] bytes.
    pub fn looks_like_pdf(&self) -> bool {
        let end = self.0.len().min(PDF_HEADER_WINDOW + PDF_MAGIC.len() - 1);
        self.0[..end].windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
    }

    /// First four bytes, zero-padded, for error messages.
    pub fn magic(&self) -> [u8; 4] {
        let mut magic = [0u8; 4];
        let n = self.0.len().min(4);
        magic[..n].copy_from_slice(&self.0[..n]);
        magic
    }
}

impl From<Vec<u8>> for DocumentBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for DocumentBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

// The payload can be megabytes; print only its size.
impl fmt::Debug for DocumentBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentBytes({} bytes)", self.0.len())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Read a resume from a local path or an HTTP/HTTPS URL.
///
/// The bytes are returned as-is; PDF validation happens in the rasteriser so
/// that every caller gets the same error for a non-PDF upload.
pub async fn load_document(input: &str, timeout_secs: u64) -> Result<DocumentBytes, AtsError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<DocumentBytes, AtsError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(DocumentBytes(bytes))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AtsError::FileNotFound { path }),
        Err(e) => Err(AtsError::DocumentLoad {
            source_name: path_str.to_string(),
            reason: e.to_string(),
        }),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<DocumentBytes, AtsError> {
    info!("Downloading resume from: {}", url);

    let load_err = |reason: String| AtsError::DocumentLoad {
        source_name: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| load_err(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            load_err(format!("timed out after {timeout_secs}s"))
        } else {
            load_err(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(load_err(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| load_err(e.to_string()))?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(DocumentBytes(bytes.to_vec()))
}
