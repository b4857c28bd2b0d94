pub mod chat;
pub mod image;
pub mod video;

use std::sync::Arc;

use crate::error::AppError;
use crate::media::DataUri;
use crate::models::{ChatMessage, GenerationRequest};
use crate::provider::GenerativeClient;

pub use self::chat::ChatOutcome;
pub use self::video::{AssembledVideo, VideoSettings};

/// The studio holds the provider client and video settings and dispatches
/// each request variant to its flow.
pub struct Studio {
    provider: Arc<dyn GenerativeClient>,
    video: VideoSettings,
}

impl Studio {
    pub fn new(provider: Arc<dyn GenerativeClient>, video: VideoSettings) -> Self {
        Self { provider, video }
    }

    pub async fn generate_image(&self, request: GenerationRequest) -> Result<DataUri, AppError> {
        match request {
            GenerationRequest::FromDescription { description } => {
                image::from_description(self.provider.as_ref(), &description).await
            }
            GenerationRequest::Enhance { image, prompt } => {
                let image = DataUri::parse(&image)?;
                image::enhance(self.provider.as_ref(), &image, prompt.as_deref()).await
            }
            GenerationRequest::WithCharacter { prompt, images, .. } => {
                let references = images
                    .iter()
                    .map(|i| DataUri::parse(i))
                    .collect::<Result<Vec<_>, _>>()?;
                image::with_character(self.provider.as_ref(), &prompt, &references).await
            }
            GenerationRequest::StyleTransfer {
                prompt,
                style_image,
                strength,
            } => {
                let style = DataUri::parse(&style_image)?;
                image::transfer_style(self.provider.as_ref(), &prompt, &style, strength).await
            }
        }
    }

    pub async fn improve_prompt(&self, original: &str) -> Result<String, AppError> {
        image::improve_prompt(self.provider.as_ref(), original).await
    }

    pub async fn chat(
        &self,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<ChatOutcome, AppError> {
        chat::chat(self.provider.as_ref(), history, new_message).await
    }

    /// Mux a still image and optional synthesized narration into an MP4.
    pub async fn narrated_video(
        &self,
        image: &DataUri,
        narration: Option<&str>,
    ) -> Result<AssembledVideo, AppError> {
        video::assemble(self.provider.as_ref(), &self.video, image, narration).await
    }

    /// Prompt-only video via the provider's long-running operation.
    pub async fn remote_video(&self, prompt: &str) -> Result<DataUri, AppError> {
        video::generate_remote(self.provider.as_ref(), &self.video, prompt).await
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::media::DataUri;
    use crate::provider::{
        Generated, GenerativeClient, Modality, OperationHandle, Part, VideoOperation,
    };

    /// Records every call so flows can be checked for call count and the
    /// exact parts forwarded to the provider.
    #[derive(Default)]
    pub struct FakeProvider {
        pub calls: Mutex<Vec<Vec<Part>>>,
        pub reply_media: Option<DataUri>,
        pub reply_text: Option<String>,
        pub speech_pcm: Vec<u8>,
        pub polls_until_done: Mutex<u32>,
        pub video_result: Option<DataUri>,
        pub video_error: Option<String>,
    }

    impl FakeProvider {
        pub fn with_image() -> Self {
            Self {
                reply_media: Some(DataUri::from_bytes("image/png", b"fake-image")),
                ..Self::default()
            }
        }

        pub fn with_text(text: &str) -> Self {
            Self {
                reply_text: Some(text.to_string()),
                ..Self::default()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl GenerativeClient for FakeProvider {
        async fn generate(
            &self,
            parts: &[Part],
            _modalities: &[Modality],
        ) -> Result<Generated, AppError> {
            self.calls.lock().unwrap().push(parts.to_vec());
            if self.reply_media.is_none() && self.reply_text.is_none() {
                return Err(AppError::Provider("no content was returned".into()));
            }
            Ok(Generated {
                media: self.reply_media.clone(),
                text: self.reply_text.clone(),
            })
        }

        async fn synthesize_speech(
            &self,
            _text: &str,
            _voice: &str,
        ) -> Result<Vec<u8>, AppError> {
            Ok(self.speech_pcm.clone())
        }

        async fn start_video(&self, _prompt: &str) -> Result<OperationHandle, AppError> {
            Ok(OperationHandle {
                name: "operations/fake".into(),
            })
        }

        async fn poll_video(&self, _op: &OperationHandle) -> Result<VideoOperation, AppError> {
            let mut remaining = self.polls_until_done.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(VideoOperation {
                    done: false,
                    video: None,
                    error: None,
                });
            }
            Ok(VideoOperation {
                done: true,
                video: self.video_result.clone(),
                error: self.video_error.clone(),
            })
        }
    }
}
