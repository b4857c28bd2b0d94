use async_trait::async_trait;
use log::info;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::{Generated, GenerativeClient, Modality, OperationHandle, Part, VideoOperation};
use crate::error::AppError;
use crate::media::DataUri;

/// Models used for the different capabilities of the service.
#[derive(Clone, Debug)]
pub struct GeminiModels {
    pub image: String,
    pub text: String,
    pub tts: String,
    pub video: String,
}

pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    base_url: String,
    models: GeminiModels,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<ContentPart>,
}

#[derive(Serialize, Deserialize)]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
    #[serde(rename = "speechConfig", skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Serialize)]
struct SpeechConfig {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    voice_name: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Serialize)]
struct StartVideoRequest {
    instances: Vec<VideoInstance>,
}

#[derive(Serialize)]
struct VideoInstance {
    prompt: String,
}

#[derive(Deserialize)]
struct OperationStatus {
    name: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<OperationResponse>,
}

#[derive(Deserialize)]
struct OperationError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct OperationResponse {
    #[serde(rename = "generateVideoResponse")]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Deserialize)]
struct GenerateVideoResponse {
    #[serde(rename = "generatedSamples", default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Deserialize)]
struct GeneratedSample {
    video: Option<VideoFile>,
}

#[derive(Deserialize)]
struct VideoFile {
    uri: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        base_url: String,
        models: GeminiModels,
    ) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(AppError::Http)?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        })
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    async fn call_generate(
        &self,
        model: &str,
        body: &GenerateRequest,
    ) -> Result<Generated, AppError> {
        let resp = self
            .http
            .post(self.generate_url(model))
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let parsed: GenerateResponse = resp.json().await?;
        extract_generated(parsed)
    }
}

fn build_parts(parts: &[Part]) -> Vec<ContentPart> {
    parts
        .iter()
        .map(|p| match p {
            Part::Text(text) => ContentPart {
                text: Some(text.clone()),
                inline_data: None,
            },
            Part::InlineData { mime, data } => ContentPart {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: mime.clone(),
                    data: data.clone(),
                }),
            },
        })
        .collect()
}

fn extract_generated(resp: GenerateResponse) -> Result<Generated, AppError> {
    let mut out = Generated::default();
    let parts = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    for part in parts {
        if let Some(inline) = part.inline_data {
            if out.media.is_none() {
                out.media = Some(DataUri {
                    mime: inline.mime_type,
                    data: inline.data,
                });
            }
        } else if let Some(text) = part.text {
            match &mut out.text {
                Some(existing) => existing.push_str(&text),
                None => out.text = Some(text),
            }
        }
    }

    if out.media.is_none() && out.text.is_none() {
        return Err(AppError::Provider("no content was returned".into()));
    }
    Ok(out)
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(
        &self,
        parts: &[Part],
        modalities: &[Modality],
    ) -> Result<Generated, AppError> {
        let wants_image = modalities.contains(&Modality::Image);
        let model = if wants_image {
            &self.models.image
        } else {
            &self.models.text
        };
        info!(
            "GeminiClient::generate → model={} parts={} modalities={:?}",
            model,
            parts.len(),
            modalities
        );

        let body = GenerateRequest {
            contents: vec![Content {
                parts: build_parts(parts),
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: modalities.iter().map(|m| m.as_str().to_string()).collect(),
                speech_config: None,
            }),
        };
        self.call_generate(model, &body).await
    }

    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>, AppError> {
        info!(
            "GeminiClient::synthesize_speech → model={} voice={}",
            self.models.tts, voice
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: build_parts(&[Part::text(text)]),
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec![Modality::Audio.as_str().to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.to_string(),
                        },
                    },
                }),
            }),
        };

        let generated = self.call_generate(&self.models.tts, &body).await?;
        let media = generated
            .media
            .ok_or_else(|| AppError::Provider("no narration audio was returned".into()))?;
        media.decode()
    }

    async fn start_video(&self, prompt: &str) -> Result<OperationHandle, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:predictLongRunning?key={}",
            self.base_url, self.models.video, self.api_key
        );
        info!("GeminiClient::start_video → model={}", self.models.video);

        let body = StartVideoRequest {
            instances: vec![VideoInstance {
                prompt: prompt.to_string(),
            }],
        };
        let resp = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let status: OperationStatus = resp.json().await?;
        let name = status
            .name
            .ok_or_else(|| AppError::Provider("operation handle missing a name".into()))?;
        Ok(OperationHandle { name })
    }

    async fn poll_video(&self, op: &OperationHandle) -> Result<VideoOperation, AppError> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.base_url, op.name, self.api_key
        );
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let status: OperationStatus = resp.json().await?;

        if !status.done {
            return Ok(VideoOperation {
                done: false,
                video: None,
                error: None,
            });
        }
        if let Some(err) = status.error {
            return Ok(VideoOperation {
                done: true,
                video: None,
                error: Some(err.message.unwrap_or_else(|| "operation failed".into())),
            });
        }

        let uri = status
            .response
            .and_then(|r| r.generate_video_response)
            .and_then(|r| r.generated_samples.into_iter().next())
            .and_then(|s| s.video)
            .and_then(|v| v.uri);

        let video = match uri {
            Some(uri) => {
                // The result file endpoint requires the same API key.
                let bytes = self
                    .http
                    .get(&uri)
                    .query(&[("key", self.api_key.as_str())])
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?;
                Some(DataUri::from_bytes("video/mp4", &bytes))
            }
            None => None,
        };

        Ok(VideoOperation {
            done: true,
            video,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_serializes_inline_data_in_order() {
        let parts = build_parts(&[
            Part::text("look at this"),
            Part::InlineData {
                mime: "image/png".into(),
                data: "aGk=".into(),
            },
        ]);
        let body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["TEXT".into(), "IMAGE".into()],
                speech_config: None,
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "look at this");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["generationConfig"]["responseModalities"][1], "IMAGE");
    }

    #[test]
    fn speech_config_carries_prebuilt_voice() {
        let config = GenerationConfig {
            response_modalities: vec!["AUDIO".into()],
            speech_config: Some(SpeechConfig {
                voice_config: VoiceConfig {
                    prebuilt_voice_config: PrebuiltVoiceConfig {
                        voice_name: "Algenib".into(),
                    },
                },
            }),
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(
            json["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]["voiceName"],
            "Algenib"
        );
    }

    #[test]
    fn extracts_media_and_text_from_response() {
        let resp: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "aGk=" } }
                    ]
                }
            }]
        }))
        .unwrap();
        let generated = extract_generated(resp).unwrap();
        assert_eq!(generated.text.as_deref(), Some("here you go"));
        assert_eq!(generated.media.unwrap().mime, "image/png");
    }

    #[test]
    fn empty_response_is_a_provider_error() {
        let resp: GenerateResponse =
            serde_json::from_value(serde_json::json!({ "candidates": [] })).unwrap();
        assert!(matches!(
            extract_generated(resp),
            Err(AppError::Provider(_))
        ));
    }
}
