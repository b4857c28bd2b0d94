use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use log::info;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{auth, AppState};
use crate::error::AppError;
use crate::media::DataUri;
use crate::models::{Character, CharacterImage, ChartData, ChatMessage, GenerationRequest};

pub fn routes(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/signup", post(auth::signup));

    let protected = Router::new()
        .route("/api/characters", get(list_characters).post(create_character))
        .route("/api/characters/{id}", delete(delete_character))
        .route("/api/generate/image", post(generate_image))
        .route("/api/generate/prompt", post(improve_prompt))
        .route("/api/generate/video", post(generate_video))
        .route("/api/chat", post(chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    public.merge(protected).with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewCharacterImage {
    data_uri: String,
}

#[derive(Deserialize)]
struct CreateCharacterRequest {
    name: String,
    images: Vec<NewCharacterImage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CharacterImageView {
    data_uri: String,
    size: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CharacterView {
    id: String,
    name: String,
    images: Vec<CharacterImageView>,
    created_at: String,
}

impl From<Character> for CharacterView {
    fn from(character: Character) -> Self {
        Self {
            id: character.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: character.name,
            images: character
                .images
                .into_iter()
                .map(|image| CharacterImageView {
                    data_uri: image.data_uri,
                    size: image.size,
                })
                .collect(),
            created_at: character
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

async fn list_characters(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let characters = state.store.list_characters().await?;
    let total_size = state.store.total_image_bytes().await?;
    let views: Vec<CharacterView> = characters.into_iter().map(Into::into).collect();
    Ok(Json(json!({
        "success": true,
        "characters": views,
        "totalSize": total_size,
    })))
}

async fn create_character(
    State(state): State<AppState>,
    Json(body): Json<CreateCharacterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("Character name is required.".into()));
    }
    if body.images.is_empty() {
        return Err(AppError::InvalidInput(
            "At least one image is required.".into(),
        ));
    }

    // Sizes come from the decoded payloads, not from client-declared values.
    let mut images = Vec::with_capacity(body.images.len());
    let mut incoming_bytes: i64 = 0;
    for image in &body.images {
        let uri = DataUri::parse(&image.data_uri)?;
        let size = uri.decode()?.len() as i64;
        incoming_bytes += size;
        images.push(CharacterImage {
            data_uri: image.data_uri.clone(),
            size,
        });
    }

    if state.store.find_character_by_name(name).await?.is_some() {
        return Err(AppError::Conflict(
            "A character with this name already exists.".into(),
        ));
    }

    // The quota check happens before any write.
    let stored_bytes = state.store.total_image_bytes().await?;
    if exceeds_quota(stored_bytes, incoming_bytes, state.quota_bytes) {
        return Err(AppError::QuotaExceeded(format!(
            "Storage limit of {} MB reached.",
            state.quota_bytes / (1024 * 1024)
        )));
    }

    let character = Character {
        id: None,
        name: name.to_string(),
        images,
        created_at: DateTime::now(),
    };
    let id = state.store.insert_character(&character).await?;
    info!(
        "Created character '{}' ({} bytes)",
        character.name, incoming_bytes
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Character created successfully.",
            "characterId": id.to_hex(),
        })),
    ))
}

async fn delete_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = ObjectId::parse_str(&id)
        .map_err(|_| AppError::InvalidInput("Invalid character ID.".into()))?;
    if !state.store.delete_character(id).await? {
        return Err(AppError::NotFound("Character not found.".into()));
    }
    info!("Deleted character {}", id.to_hex());
    Ok(Json(json!({
        "success": true,
        "message": "Character deleted successfully.",
    })))
}

async fn generate_image(
    State(state): State<AppState>,
    Json(mut request): Json<GenerationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    // Library lookups are resolved here so the flows only see inline media.
    if let GenerationRequest::WithCharacter {
        character_id,
        images,
        ..
    } = &mut request
    {
        if let Some(raw_id) = character_id.take() {
            let id = ObjectId::parse_str(&raw_id)
                .map_err(|_| AppError::InvalidInput("Invalid character ID.".into()))?;
            let character = state
                .store
                .find_character(id)
                .await?
                .ok_or_else(|| AppError::NotFound("Character not found.".into()))?;
            let stored = character.images.into_iter().map(|i| i.data_uri);
            images.splice(0..0, stored);
        }
    }

    let image = state.studio.generate_image(request).await?;
    Ok(Json(json!({ "success": true, "imageUrl": image.to_string() })))
}

#[derive(Deserialize)]
struct ImprovePromptRequest {
    prompt: String,
}

async fn improve_prompt(
    State(state): State<AppState>,
    Json(body): Json<ImprovePromptRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let improved = state.studio.improve_prompt(&body.prompt).await?;
    Ok(Json(json!({ "success": true, "improvedPrompt": improved })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest {
    #[serde(default)]
    history: Vec<ChatMessage>,
    new_message: String,
}

#[derive(Serialize)]
struct ChatReply {
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    chart: Option<ChartData>,
}

async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let outcome = state.studio.chat(&body.history, &body.new_message).await?;
    Ok(Json(ChatReply {
        response: outcome.response,
        chart: outcome.chart,
    }))
}

#[derive(Deserialize)]
struct VideoRequest {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    narration: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

async fn generate_video(
    State(state): State<AppState>,
    Json(body): Json<VideoRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(image) = body.image.as_deref() {
        let image = DataUri::parse(image)?;
        let assembled = state
            .studio
            .narrated_video(&image, body.narration.as_deref())
            .await?;
        return Ok(Json(json!({
            "success": true,
            "videoUrl": assembled.video.to_string(),
            "audioUrl": assembled.audio.map(|a| a.to_string()),
        })));
    }

    let prompt = body
        .prompt
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput("Either an image or a video prompt is required.".into())
        })?;
    let video = state.studio.remote_video(prompt).await?;
    Ok(Json(json!({
        "success": true,
        "videoUrl": video.to_string(),
        "audioUrl": null,
    })))
}

fn exceeds_quota(stored: i64, incoming: i64, quota: i64) -> bool {
    stored + incoming > quota
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_a_hard_cap() {
        assert!(!exceeds_quota(0, 100, 100));
        assert!(exceeds_quota(1, 100, 100));
        assert!(!exceeds_quota(50, 50, 100));
    }

    #[test]
    fn character_view_uses_wire_field_names() {
        let view = CharacterView {
            id: "abc".into(),
            name: "Omondi".into(),
            images: vec![CharacterImageView {
                data_uri: "data:image/png;base64,aGk=".into(),
                size: 2,
            }],
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["images"][0].get("dataUri").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn chat_request_accepts_missing_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"newMessage": "hello"}"#).unwrap();
        assert!(req.history.is_empty());
        assert_eq!(req.new_message, "hello");
    }

    #[test]
    fn video_request_fields_are_all_optional() {
        let req: VideoRequest = serde_json::from_str("{}").unwrap();
        assert!(req.image.is_none() && req.narration.is_none() && req.prompt.is_none());
    }
}
