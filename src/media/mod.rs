use std::fmt;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::AppError;

/// Self-describing encoded media: `data:<mime>;base64,<payload>`.
///
/// Every image, audio and video payload crosses the API in this form, so the
/// raw bytes never travel as a separate upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub mime: String,
    pub data: String,
}

impl DataUri {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| AppError::InvalidInput("Expected a data URI.".into()))?;
        let (mime, data) = rest.split_once(";base64,").ok_or_else(|| {
            AppError::InvalidInput("Data URI must be base64 encoded.".into())
        })?;
        if mime.is_empty() {
            return Err(AppError::InvalidInput(
                "Data URI is missing a MIME type.".into(),
            ));
        }
        Ok(Self {
            mime: mime.to_string(),
            data: data.to_string(),
        })
    }

    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self {
            mime: mime.to_string(),
            data: BASE64.encode(bytes),
        }
    }

    pub fn decode(&self) -> Result<Vec<u8>, AppError> {
        BASE64
            .decode(&self.data)
            .map_err(|e| AppError::InvalidInput(format!("Invalid base64 payload: {}", e)))
    }

    /// File extension for temp-file naming when the payload is handed to an
    /// external tool.
    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "audio/wav" => "wav",
            "video/mp4" => "mp4",
            _ => "bin",
        }
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime, self.data)
    }
}

/// Wrap raw little-endian 16-bit PCM (the TTS model's output format) in a WAV
/// container. Trailing odd bytes are dropped.
pub fn pcm_to_wav(
    pcm: &[u8],
    channels: u16,
    sample_rate: u32,
) -> Result<Vec<u8>, AppError> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_data_uri() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.mime, "image/png");
        assert_eq!(uri.decode().unwrap(), b"hello");
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(DataUri::parse("image/png;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn rejects_non_base64_marker() {
        assert!(DataUri::parse("data:image/png,plain").is_err());
    }

    #[test]
    fn rejects_empty_mime() {
        assert!(DataUri::parse("data:;base64,aGVsbG8=").is_err());
    }

    #[test]
    fn round_trips_bytes() {
        let uri = DataUri::from_bytes("video/mp4", &[0, 1, 2, 255]);
        let rendered = uri.to_string();
        let parsed = DataUri::parse(&rendered).unwrap();
        assert_eq!(parsed.decode().unwrap(), vec![0, 1, 2, 255]);
        assert_eq!(parsed.extension(), "mp4");
    }

    #[test]
    fn unknown_mime_falls_back_to_bin() {
        let uri = DataUri::from_bytes("application/x-thing", b"x");
        assert_eq!(uri.extension(), "bin");
    }

    #[test]
    fn wav_wraps_pcm_with_riff_header() {
        let pcm: Vec<u8> = vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
        let wav = pcm_to_wav(&pcm, 1, 24000).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        // 44-byte canonical header plus the samples.
        assert_eq!(wav.len(), 44 + pcm.len());
    }

    #[test]
    fn wav_drops_trailing_odd_byte() {
        let wav = pcm_to_wav(&[0x00, 0x01, 0x02], 1, 24000).unwrap();
        assert_eq!(wav.len(), 44 + 2);
    }
}
