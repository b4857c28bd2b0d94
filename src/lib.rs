pub mod cli;
pub mod error;
pub mod flows;
pub mod media;
pub mod models;
pub mod provider;
pub mod server;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use log::info;

use cli::Args;
use error::AppError;
use flows::{Studio, VideoSettings};
use provider::gemini::{GeminiClient, GeminiModels};
use server::{AppState, AuthConfig};
use store::Store;

pub async fn run(args: Args) -> Result<(), AppError> {
    if args.gemini_api_key.trim().is_empty() {
        return Err(AppError::Internal("GEMINI_API_KEY is not set".into()));
    }
    if args.jwt_secret.trim().is_empty() {
        return Err(AppError::Internal("JWT_SECRET is not set".into()));
    }

    let store = Store::connect(&args.mongodb_uri, &args.mongodb_database).await?;

    let provider = GeminiClient::new(
        args.gemini_api_key.clone(),
        args.gemini_base_url.clone(),
        GeminiModels {
            image: args.image_model.clone(),
            text: args.text_model.clone(),
            tts: args.tts_model.clone(),
            video: args.video_model.clone(),
        },
    )?;

    let video = VideoSettings {
        ffmpeg_path: VideoSettings::resolve_tool(args.ffmpeg_path.clone(), "ffmpeg"),
        ffprobe_path: VideoSettings::resolve_tool(args.ffprobe_path.clone(), "ffprobe"),
        width: args.video_width,
        height: args.video_height,
        default_duration: args.video_default_duration_secs,
        voice: args.tts_voice.clone(),
        poll_interval: Duration::from_secs(args.video_poll_interval_secs),
        poll_attempts: args.video_poll_attempts,
    };
    info!("ffmpeg: {} / ffprobe: {}", video.ffmpeg_path, video.ffprobe_path);

    let studio = Arc::new(Studio::new(Arc::new(provider), video));
    let auth = Arc::new(AuthConfig::new(
        &args.jwt_secret,
        args.session_cookie.clone(),
        args.session_ttl_secs,
        args.secure_cookies,
    ));

    let state = AppState {
        store,
        studio,
        auth,
        quota_bytes: args.storage_quota_bytes,
    };

    server::serve(&args.server_addr, state).await
}
