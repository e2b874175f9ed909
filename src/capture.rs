//! Camera and upload capture.
//!
//! The platform side (opening a camera, grabbing a frame, reading a picked
//! file) sits behind [`CaptureProvider`]. [`CaptureSession`] is what the
//! camera modal drives: it holds at most one live stream and hands it back to
//! the provider on every way out (photo taken, upload chosen, retake, confirm,
//! close, drop).

use crate::types::{EncodedImage, image_mime_type};
use async_trait::async_trait;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, the one pointed at the plant.
    #[default]
    Environment,
    User,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::Environment,
            ideal_width: 1280,
            ideal_height: 720,
        }
    }
}

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

/// Token for an acquired camera stream. Not `Clone`: giving it back through
/// [`CaptureProvider::release_stream`] consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaStream {
    id: u64,
}

impl MediaStream {
    pub fn new() -> Self {
        Self {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for MediaStream {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnavailableReason {
    PermissionDenied,
    NoDevice,
    /// The device exists and was granted but could not be used (busy,
    /// unplugged mid-stream, failed to encode a frame).
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Unable to access camera. Please allow camera permissions or upload an image.")]
    Unavailable { reason: UnavailableReason },

    #[error("Unable to read {name}: {message}")]
    UnreadableFile { name: String, message: String },

    #[error("{name} is not an image. Please choose a photo of your plant.")]
    NotAnImage { name: String },
}

impl CaptureError {
    pub fn unavailable(reason: UnavailableReason) -> Self {
        CaptureError::Unavailable { reason }
    }
}

/// A file chosen in the upload picker.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectedFile {
    /// Contents already read by the UI's file engine.
    Loaded { name: String, bytes: Vec<u8> },
    Path(PathBuf),
}

#[async_trait]
pub trait CaptureProvider: Send + Sync {
    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// Stops every track of `stream`.
    fn release_stream(&self, stream: MediaStream);

    fn snapshot_frame(
        &self,
        stream: &MediaStream,
        quality: f32,
    ) -> Result<EncodedImage, CaptureError>;

    async fn read_file_as_encoded_image(
        &self,
        file: SelectedFile,
    ) -> Result<EncodedImage, CaptureError> {
        match file {
            SelectedFile::Loaded { name, bytes } => encode_file(&name, &bytes),
            SelectedFile::Path(path) => {
                let name = path.display().to_string();
                let bytes = tokio::fs::read(&path).await.map_err(|err| {
                    CaptureError::UnreadableFile {
                        name: name.clone(),
                        message: err.to_string(),
                    }
                })?;
                encode_file(&name, &bytes)
            }
        }
    }
}

pub fn encode_file(name: &str, bytes: &[u8]) -> Result<EncodedImage, CaptureError> {
    let mime = image_mime_type(name).ok_or_else(|| CaptureError::NotAnImage {
        name: name.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(CaptureError::UnreadableFile {
            name: name.to_string(),
            message: "file is empty".to_string(),
        });
    }
    Ok(EncodedImage::from_bytes(mime, bytes))
}

/// Native targets have no camera bridge, so the upload path is the only
/// source of photos there.
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopCapture;

#[async_trait]
impl CaptureProvider for DesktopCapture {
    async fn acquire_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<MediaStream, CaptureError> {
        tracing::info!(
            width = constraints.ideal_width,
            height = constraints.ideal_height,
            "no camera device available on this platform"
        );
        Err(CaptureError::unavailable(UnavailableReason::NoDevice))
    }

    fn release_stream(&self, stream: MediaStream) {
        tracing::debug!(stream = stream.id(), "released camera stream");
    }

    fn snapshot_frame(
        &self,
        _stream: &MediaStream,
        _quality: f32,
    ) -> Result<EncodedImage, CaptureError> {
        Err(CaptureError::unavailable(UnavailableReason::NoDevice))
    }
}

/// Pairs an in-flight stream request with the state it was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenAttempt {
    id: u64,
    pub constraints: StreamConstraints,
}

#[derive(Debug, Default, PartialEq)]
enum CapturePhase {
    #[default]
    Idle,
    Opening(u64),
    Live(MediaStream),
    Captured(EncodedImage),
}

pub struct CaptureSession {
    provider: Arc<dyn CaptureProvider>,
    constraints: StreamConstraints,
    quality: f32,
    phase: CapturePhase,
    error: Option<CaptureError>,
    attempts: u64,
    closed: bool,
}

impl CaptureSession {
    pub fn new(
        provider: Arc<dyn CaptureProvider>,
        constraints: StreamConstraints,
        quality: f32,
    ) -> Self {
        Self {
            provider,
            constraints,
            quality,
            phase: CapturePhase::Idle,
            error: None,
            attempts: 0,
            closed: false,
        }
    }

    pub fn provider(&self) -> Arc<dyn CaptureProvider> {
        self.provider.clone()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, CapturePhase::Opening(_))
    }

    pub fn is_live(&self) -> bool {
        matches!(self.phase, CapturePhase::Live(_))
    }

    pub fn captured(&self) -> Option<&EncodedImage> {
        match &self.phase {
            CapturePhase::Captured(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CaptureError> {
        self.error.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Starts a camera request. Any live stream or preview is dropped first.
    pub fn begin_open(&mut self) -> OpenAttempt {
        self.release_live_stream();
        self.error = None;
        self.attempts += 1;
        self.phase = CapturePhase::Opening(self.attempts);
        OpenAttempt {
            id: self.attempts,
            constraints: self.constraints,
        }
    }

    /// Installs the outcome of `attempt`. A stream for an attempt that is no
    /// longer current (closed, retaken, replaced by an upload) is released.
    pub fn finish_open(&mut self, attempt: OpenAttempt, result: Result<MediaStream, CaptureError>) {
        let current = !self.closed && self.phase == CapturePhase::Opening(attempt.id);
        match result {
            Ok(stream) if current => {
                tracing::debug!(stream = stream.id(), "camera stream acquired");
                self.phase = CapturePhase::Live(stream);
            }
            Ok(stream) => {
                tracing::debug!(stream = stream.id(), "discarding stream for stale request");
                self.provider.release_stream(stream);
            }
            Err(err) if current => {
                tracing::warn!(error = ?err, "camera unavailable");
                self.error = Some(err);
                self.phase = CapturePhase::Idle;
            }
            Err(_) => {}
        }
    }

    pub async fn open_camera(&mut self) {
        let attempt = self.begin_open();
        let provider = self.provider.clone();
        let result = provider.acquire_stream(&attempt.constraints).await;
        self.finish_open(attempt, result);
    }

    /// Freezes the current frame and stops the camera. Without a live stream
    /// this does nothing. A failed snapshot is kept in [`Self::error`] and the
    /// stream stays live so the shutter can be pressed again.
    pub fn take_photo(&mut self) -> Result<(), CaptureError> {
        let CapturePhase::Live(stream) = &self.phase else {
            return Ok(());
        };
        match self.provider.snapshot_frame(stream, self.quality) {
            Ok(image) => {
                self.release_live_stream();
                self.error = None;
                self.phase = CapturePhase::Captured(image);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = ?err, "snapshot failed");
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Throws the preview away and asks for the camera again.
    pub fn retake(&mut self) -> OpenAttempt {
        self.begin_open()
    }

    pub fn accept_upload(&mut self, image: EncodedImage) {
        if self.closed {
            return;
        }
        self.release_live_stream();
        self.error = None;
        self.phase = CapturePhase::Captured(image);
    }

    pub fn reject_upload(&mut self, err: CaptureError) {
        tracing::warn!(error = %err, "upload rejected");
        self.error = Some(err);
    }

    /// Hands the preview to the caller and finishes the session.
    pub fn confirm(&mut self) -> Option<EncodedImage> {
        self.release_live_stream();
        self.closed = true;
        match mem::take(&mut self.phase) {
            CapturePhase::Captured(image) => Some(image),
            _ => None,
        }
    }

    pub fn close(&mut self) {
        self.release_live_stream();
        self.phase = CapturePhase::Idle;
        self.closed = true;
    }

    fn release_live_stream(&mut self) {
        if matches!(self.phase, CapturePhase::Live(_))
            && let CapturePhase::Live(stream) = mem::take(&mut self.phase)
        {
            tracing::debug!(stream = stream.id(), "releasing camera stream");
            self.provider.release_stream(stream);
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release_live_stream();
    }
}
