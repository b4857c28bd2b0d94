use clap::Parser;
use dotenv::dotenv;
use log::info;
use omondi_studio::cli::Args;
use omondi_studio::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("MongoDB URI: {}", args.mongodb_uri);
    info!("MongoDB Database: {}", args.mongodb_database);
    info!("Provider Base URL: {}", args.gemini_base_url);
    info!("Image Model: {}", args.image_model);
    info!("Text Model: {}", args.text_model);
    info!("TTS Model: {}", args.tts_model);
    info!("Video Model: {}", args.video_model);
    info!("Storage Quota: {} bytes", args.storage_quota_bytes);
    info!("Session TTL: {}s", args.session_ttl_secs);
    info!("-------------------------");

    omondi_studio::run(args).await
}
