pub mod gemini;

use async_trait::async_trait;

use crate::error::AppError;
use crate::media::DataUri;

pub use self::gemini::GeminiClient;

/// One piece of a generation prompt, in the order the provider will see it.
#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Text(String),
    InlineData { mime: String, data: String },
}

impl Part {
    pub fn text(s: impl Into<String>) -> Self {
        Part::Text(s.into())
    }

    pub fn media(uri: &DataUri) -> Self {
        Part::InlineData {
            mime: uri.mime.clone(),
            data: uri.data.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
    Audio,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
            Modality::Audio => "AUDIO",
        }
    }
}

/// What a single provider call produced: inline media, text, or both.
#[derive(Clone, Debug, Default)]
pub struct Generated {
    pub media: Option<DataUri>,
    pub text: Option<String>,
}

/// Handle for a long-running provider video job.
#[derive(Clone, Debug)]
pub struct OperationHandle {
    pub name: String,
}

/// Resolved state of one poll of a video operation.
#[derive(Clone, Debug)]
pub struct VideoOperation {
    pub done: bool,
    pub video: Option<DataUri>,
    pub error: Option<String>,
}

/// The external generative service, treated as a black box: given a prompt
/// and optional reference media, return generated media or text.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(
        &self,
        parts: &[Part],
        modalities: &[Modality],
    ) -> Result<Generated, AppError>;

    /// Synthesize narration speech. Returns raw 16-bit mono PCM at 24 kHz.
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, AppError>;

    async fn start_video(&self, prompt: &str) -> Result<OperationHandle, AppError>;

    async fn poll_video(&self, op: &OperationHandle) -> Result<VideoOperation, AppError>;
}
