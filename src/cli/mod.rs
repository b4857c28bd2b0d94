use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Server Args ---
    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    // --- Store Args ---
    /// MongoDB connection string.
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://127.0.0.1:27017")]
    pub mongodb_uri: String,

    /// MongoDB database holding the user and character collections.
    #[arg(long, env = "MONGODB_DATABASE", default_value = "omondi_studio")]
    pub mongodb_database: String,

    /// Cap on total stored reference-image bytes across all characters.
    #[arg(long, env = "STORAGE_QUOTA_BYTES", default_value = "419430400")]
    pub storage_quota_bytes: i64,

    // --- Provider Args ---
    /// API key for the generative provider. Required.
    #[arg(long, env = "GEMINI_API_KEY")]
    pub gemini_api_key: String,

    /// Base URL for the provider API.
    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub gemini_base_url: String,

    /// Model used for image generation and editing.
    #[arg(
        long,
        env = "IMAGE_MODEL",
        default_value = "gemini-2.0-flash-preview-image-generation"
    )]
    pub image_model: String,

    /// Model used for chat and prompt refinement.
    #[arg(long, env = "TEXT_MODEL", default_value = "gemini-2.0-flash")]
    pub text_model: String,

    /// Model used for narration text-to-speech.
    #[arg(long, env = "TTS_MODEL", default_value = "gemini-2.5-flash-preview-tts")]
    pub tts_model: String,

    /// Model behind the long-running video operation.
    #[arg(long, env = "VIDEO_MODEL", default_value = "veo-2.0-generate-001")]
    pub video_model: String,

    /// Prebuilt voice used for narration synthesis.
    #[arg(long, env = "TTS_VOICE", default_value = "Algenib")]
    pub tts_voice: String,

    // --- Auth Args ---
    /// Secret used to sign session tokens. Required.
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: String,

    /// Session token lifetime in seconds.
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "3600")]
    pub session_ttl_secs: i64,

    /// Name of the HTTP-only session cookie.
    #[arg(long, env = "SESSION_COOKIE", default_value = "auth_token")]
    pub session_cookie: String,

    /// Mark the session cookie Secure (HTTPS-only deployments).
    #[arg(long, env = "SECURE_COOKIES", default_value = "false")]
    pub secure_cookies: bool,

    // --- Video Args ---
    /// Path to the ffmpeg binary. Discovered on PATH when unset.
    #[arg(long, env = "FFMPEG_PATH")]
    pub ffmpeg_path: Option<String>,

    /// Path to the ffprobe binary. Discovered on PATH when unset.
    #[arg(long, env = "FFPROBE_PATH")]
    pub ffprobe_path: Option<String>,

    /// Output frame width for assembled clips.
    #[arg(long, env = "VIDEO_WIDTH", default_value = "1280")]
    pub video_width: u32,

    /// Output frame height for assembled clips.
    #[arg(long, env = "VIDEO_HEIGHT", default_value = "720")]
    pub video_height: u32,

    /// Clip length in seconds when there is no narration.
    #[arg(long, env = "VIDEO_DEFAULT_DURATION_SECS", default_value = "5.0")]
    pub video_default_duration_secs: f64,

    /// Seconds between polls of a provider video operation.
    #[arg(long, env = "VIDEO_POLL_INTERVAL_SECS", default_value = "5")]
    pub video_poll_interval_secs: u64,

    /// Maximum polls before a provider video operation is abandoned.
    #[arg(long, env = "VIDEO_POLL_ATTEMPTS", default_value = "60")]
    pub video_poll_attempts: u32,
}
