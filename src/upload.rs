// Multipart upload encoding with transfer progress

use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use crate::error::ClientError;

/// Default chunk size handed to the transport (64 KiB)
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default multipart field name for the file part
const DEFAULT_FIELD_NAME: &str = "file";

/// Integer percentage of `sent` over `total`, clamped to 0..=100
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

/// Forwards progress to a callback, never reporting a value lower than one
/// already reported. A replayed upload therefore resumes silently until it
/// passes the previous high-water mark.
#[derive(Clone)]
pub struct ProgressTracker {
    callback: Arc<dyn Fn(u8) + Send + Sync>,
    last: Arc<AtomicU8>,
    started: Arc<AtomicBool>,
}

impl ProgressTracker {
    pub fn new(callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
            last: Arc::new(AtomicU8::new(0)),
            started: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        let first = !self.started.swap(true, Ordering::SeqCst);
        if first || percent > previous {
            (self.callback)(percent.max(previous));
        }
    }

    /// Highest percentage reported so far
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("last", &self.last())
            .finish()
    }
}

/// A file (plus optional text fields) to send as multipart form data.
///
/// The bytes are held as [`Bytes`], so the form can be rebuilt cheaply when a
/// request is replayed after a token refresh.
#[derive(Debug, Clone)]
pub struct UploadPayload {
    field_name: String,
    file_name: String,
    mime_type: Option<String>,
    data: Bytes,
    fields: Vec<(String, String)>,
    progress: Option<ProgressTracker>,
    chunk_size: usize,
}

impl UploadPayload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            field_name: DEFAULT_FIELD_NAME.to_string(),
            file_name: file_name.into(),
            mime_type: None,
            data: data.into(),
            fields: Vec::new(),
            progress: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Add a plain text form field next to the file
    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(ProgressTracker::new(callback));
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Build the multipart form for one send attempt
    pub(crate) fn to_form(&self) -> Result<Form, ClientError> {
        let total = self.data.len() as u64;

        if let Some(tracker) = &self.progress {
            tracker.report(0);
            if total == 0 {
                tracker.report(100);
            }
        }

        let stream = progress_stream(self.data.clone(), self.chunk_size, self.progress.clone());
        let mut part = Part::stream_with_length(Body::wrap_stream(stream), total)
            .file_name(self.file_name.clone());

        if let Some(mime) = &self.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| ClientError::InvalidRequest(format!("invalid mime type {}: {}", mime, e)))?;
        }

        let mut form = Form::new();
        for (key, value) in &self.fields {
            form = form.text(key.clone(), value.clone());
        }
        Ok(form.part(self.field_name.clone(), part))
    }
}

/// Split `data` into chunks, reporting progress as each chunk is pulled
fn progress_stream(
    data: Bytes,
    chunk_size: usize,
    tracker: Option<ProgressTracker>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = data.len() as u64;
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size)
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();

    let mut sent = 0u64;
    futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        if let Some(tracker) = &tracker {
            tracker.report(percent(sent, total));
        }
        Ok(chunk)
    })
}
