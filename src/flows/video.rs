use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info};
use tokio::process::Command;

use crate::error::AppError;
use crate::media::{self, DataUri};
use crate::provider::GenerativeClient;

const TTS_SAMPLE_RATE: u32 = 24_000;

#[derive(Clone, Debug)]
pub struct VideoSettings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub width: u32,
    pub height: u32,
    /// Clip length in seconds when there is no narration to pace against.
    pub default_duration: f64,
    pub voice: String,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl VideoSettings {
    /// Resolve tool paths from explicit config or PATH lookup.
    pub fn resolve_tool(configured: Option<String>, name: &str) -> String {
        configured.unwrap_or_else(|| {
            which::which(name)
                .map_or_else(|_| name.to_string(), |p| p.to_string_lossy().to_string())
        })
    }
}

/// The assembled clip: always a video, plus the narration track when one was
/// synthesized.
#[derive(Clone, Debug)]
pub struct AssembledVideo {
    pub video: DataUri,
    pub audio: Option<DataUri>,
}

/// Loop a still image into an MP4, optionally paced by synthesized narration.
///
/// Steps run sequentially within the request: synthesize narration, write
/// temp files, invoke ffmpeg once, read back the output. The temp directory
/// is removed on every exit path, including provider and ffmpeg failure.
pub(crate) async fn assemble(
    provider: &dyn GenerativeClient,
    settings: &VideoSettings,
    image: &DataUri,
    narration: Option<&str>,
) -> Result<AssembledVideo, AppError> {
    let workdir = tempfile::tempdir()?;

    let mut audio_file: Option<PathBuf> = None;
    let mut audio_uri: Option<DataUri> = None;
    let mut duration = settings.default_duration;

    if let Some(text) = narration.map(str::trim).filter(|t| !t.is_empty()) {
        info!("Synthesizing narration ({} chars)", text.len());
        let pcm = provider.synthesize_speech(text, &settings.voice).await?;
        let wav = media::pcm_to_wav(&pcm, 1, TTS_SAMPLE_RATE)?;

        let path = workdir.path().join("narration.wav");
        tokio::fs::write(&path, &wav).await?;
        duration = probe_duration(&settings.ffprobe_path, &path).await?;

        audio_uri = Some(DataUri::from_bytes("audio/wav", &wav));
        audio_file = Some(path);
    }

    let image_path = workdir
        .path()
        .join(format!("input.{}", image.extension()));
    tokio::fs::write(&image_path, image.decode()?).await?;
    let output_path = workdir.path().join("output.mp4");

    let args = build_ffmpeg_args(
        &image_path,
        audio_file.as_deref(),
        &output_path,
        duration,
        settings.width,
        settings.height,
    );
    debug!("ffmpeg args: {:?}", args);
    info!("Muxing video ({}x{}, {:.2}s)", settings.width, settings.height, duration);

    let output = Command::new(&settings.ffmpeg_path)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Ffmpeg(format!(
            "exited with {}: {}",
            output.status,
            last_lines(&stderr, 5)
        )));
    }

    let video_bytes = tokio::fs::read(&output_path).await?;
    Ok(AssembledVideo {
        video: DataUri::from_bytes("video/mp4", &video_bytes),
        audio: audio_uri,
    })
}

/// Fixed argument template: loop the input image, attach the narration track
/// or a silent one, encode H.264 scaled and padded to the target frame.
fn build_ffmpeg_args(
    image: &Path,
    audio: Option<&Path>,
    output: &Path,
    duration: f64,
    width: u32,
    height: u32,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-loop".into(),
        "1".into(),
        "-i".into(),
        image.to_string_lossy().into_owned(),
    ];

    match audio {
        Some(path) => args.extend([
            "-i".into(),
            path.to_string_lossy().into_owned(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
        ]),
        None => args.extend([
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            "anullsrc=r=44100:cl=mono".into(),
        ]),
    }

    args.extend([
        "-t".into(),
        format!("{}", duration),
        "-c:v".into(),
        "libx264".into(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-vf".into(),
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
            w = width,
            h = height
        ),
        "-y".into(),
        output.to_string_lossy().into_owned(),
    ]);

    args
}

async fn probe_duration(ffprobe_path: &str, audio: &Path) -> Result<f64, AppError> {
    let output = Command::new(ffprobe_path)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(audio)
        .output()
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::Ffmpeg(format!(
            "ffprobe exited with {}: {}",
            output.status,
            last_lines(&stderr, 3)
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| AppError::Ffmpeg(format!("unparseable duration: {:?}", stdout.trim())))
}

/// Start the provider's video operation and poll at a fixed interval until
/// it finishes or the attempt budget runs out.
pub(crate) async fn generate_remote(
    provider: &dyn GenerativeClient,
    settings: &VideoSettings,
    prompt: &str,
) -> Result<DataUri, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::InvalidInput("A video prompt is required.".into()));
    }

    let handle = provider.start_video(prompt).await?;
    info!("Started video operation {}", handle.name);

    for attempt in 0..settings.poll_attempts {
        let state = provider.poll_video(&handle).await?;
        if state.done {
            if let Some(message) = state.error {
                return Err(AppError::Provider(message));
            }
            return state
                .video
                .ok_or_else(|| AppError::Provider("no video was returned".into()));
        }
        debug!("Operation {} still running (poll {})", handle.name, attempt + 1);
        tokio::time::sleep(settings.poll_interval).await;
    }

    Err(AppError::Provider("video operation timed out".into()))
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
