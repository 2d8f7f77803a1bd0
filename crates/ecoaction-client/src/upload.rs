use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use bytes::Bytes;
use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use ecoaction_types::api::{Ack, UploadedImage};

use crate::error::{Result, UploadRejected};
use crate::http::ApiClient;
use crate::session::Credential;

/// Upload state constants.
pub const STATE_IDLE: u8 = 0;
pub const STATE_UPLOADING: u8 = 1;
pub const STATE_COMPLETE: u8 = 2;
pub const STATE_ERROR: u8 = 3;

pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_TYPES: [&str; 5] = [
    "image/png",
    "image/jpg",
    "image/jpeg",
    "image/gif",
    "image/webp",
];

/// Shown for actions without an image.
pub const DEFAULT_IMAGE: &str = "/CommunityTreeplanting.jpeg";

const CHUNK_SIZE: usize = 64 * 1024;

/// Called with `(bytes_done, bytes_total)` as the body is sent.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Shared progress state, safe to poll from another task.
pub struct UploadProgress {
    pub bytes_done: AtomicU64,
    pub bytes_total: AtomicU64,
    pub state: AtomicU8,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self {
            bytes_done: AtomicU64::new(0),
            bytes_total: AtomicU64::new(0),
            state: AtomicU8::new(STATE_IDLE),
        }
    }

    pub fn state(&self) -> u8 {
        self.state.load(Ordering::Relaxed)
    }

    /// Fraction sent, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        let total = self.bytes_total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        (self.bytes_done.load(Ordering::Relaxed) as f64 / total as f64).min(1.0)
    }

    fn start(&self, total: u64) {
        self.bytes_total.store(total, Ordering::Relaxed);
        self.bytes_done.store(0, Ordering::Relaxed);
        self.state.store(STATE_UPLOADING, Ordering::Relaxed);
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// An image held in memory, ready to validate and send.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, taking the MIME type from its extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(UploadRejected::InvalidFilename)?
            .to_string();
        let content_type = mime_for(path).unwrap_or("application/octet-stream");
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// Local checks run before any bytes go over the wire.
pub fn validate_image(file: &ImageFile) -> std::result::Result<(), UploadRejected> {
    if file.bytes.is_empty() {
        return Err(UploadRejected::Empty);
    }
    if !ALLOWED_TYPES.contains(&file.content_type.as_str()) {
        return Err(UploadRejected::UnsupportedType {
            content_type: file.content_type.clone(),
        });
    }
    if file.size() > MAX_IMAGE_BYTES {
        return Err(UploadRejected::TooLarge { size: file.size() });
    }
    Ok(())
}

/// Validate and, on rejection, mark `progress` as failed.
pub(crate) fn precheck(file: &ImageFile, progress: &UploadProgress) -> Result<()> {
    if let Err(rejected) = validate_image(file) {
        warn!(file = %file.file_name, "image rejected: {}", rejected);
        progress.state.store(STATE_ERROR, Ordering::Relaxed);
        return Err(rejected.into());
    }
    Ok(())
}

/// `/upload/*` endpoints.
#[derive(Clone)]
pub struct UploadService {
    api: ApiClient,
}

impl UploadService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Validate, then stream `file` as the multipart field `file`.
    pub async fn upload_image(
        &self,
        credential: &Credential,
        file: &ImageFile,
        progress: Arc<UploadProgress>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<UploadedImage> {
        precheck(file, &progress)?;

        let total = file.size();
        progress.start(total);

        let chunks: Vec<Bytes> = (0..file.bytes.len())
            .step_by(CHUNK_SIZE)
            .map(|start| file.bytes.slice(start..(start + CHUNK_SIZE).min(file.bytes.len())))
            .collect();

        let prog = progress.clone();
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            let done = prog.bytes_done.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            if let Some(cb) = &on_progress {
                cb(done, total);
            }
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)?;
        let form = Form::new().part("file", part);

        debug!(file = %file.file_name, bytes = total, "uploading image");
        let builder = self
            .api
            .request(Method::POST, "/upload/image", Some(credential))
            .multipart(form);

        match self.api.execute::<UploadedImage>(Method::POST, "/upload/image", builder).await {
            Ok(uploaded) => {
                progress.state.store(STATE_COMPLETE, Ordering::Relaxed);
                info!(filename = %uploaded.filename, "image uploaded");
                Ok(uploaded)
            }
            Err(e) => {
                progress.state.store(STATE_ERROR, Ordering::Relaxed);
                Err(e)
            }
        }
    }

    pub async fn delete_image(&self, credential: &Credential, filename: &str) -> Result<Ack> {
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return Err(UploadRejected::InvalidFilename.into());
        }
        self.api
            .delete(&format!("/upload/image/{}", filename), Some(credential))
            .await
    }
}

/// Resolve a stored image path for display.
pub fn image_url(path: Option<&str>) -> String {
    match path.map(str::trim) {
        None | Some("") => DEFAULT_IMAGE.to_string(),
        Some(p) if p.starts_with("http://") || p.starts_with("https://") => p.to_string(),
        Some(p) if p.starts_with('/') => p.to_string(),
        Some(p) => format!("/{}", p),
    }
}

/// The server-side filename inside an `/uploads/` URL.
pub fn extract_filename(url: &str) -> Option<&str> {
    url.split("/uploads/").nth(1)
}
