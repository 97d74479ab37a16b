// Payload format sniffing using Symphonia
// Used when an endpoint omits or fudges the Content-Type header

use std::io::Cursor;

use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_AAC, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_NULL,
    CODEC_TYPE_PCM_F32LE, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S24LE, CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_U8, CODEC_TYPE_VORBIS,
};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// What the endpoints return when they don't say otherwise
pub const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub content_type: &'static str,
}

/// Probe an in-memory payload. Returns None if no known container matches.
pub fn sniff(bytes: &[u8]) -> Option<AudioInfo> {
    if bytes.is_empty() {
        return None;
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .ok()?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)?;

    let content_type = mime_for_codec(track.codec_params.codec)?;
    Some(AudioInfo { content_type })
}

fn mime_for_codec(codec: CodecType) -> Option<&'static str> {
    let mime = match codec {
        c if c == CODEC_TYPE_MP3 => "audio/mpeg",
        c if c == CODEC_TYPE_AAC => "audio/aac",
        c if c == CODEC_TYPE_FLAC => "audio/flac",
        c if c == CODEC_TYPE_VORBIS => "audio/ogg",
        c if c == CODEC_TYPE_PCM_S16LE
            || c == CODEC_TYPE_PCM_S24LE
            || c == CODEC_TYPE_PCM_S32LE
            || c == CODEC_TYPE_PCM_F32LE
            || c == CODEC_TYPE_PCM_U8 =>
        {
            "audio/wav"
        }
        _ => return None,
    };
    Some(mime)
}

/// Pick the content type for a fetched payload: trust a specific audio header,
/// otherwise sniff, otherwise assume MP3.
pub fn content_type_for(header: Option<&str>, bytes: &[u8]) -> String {
    if let Some(header) = header {
        let mime = header.split(';').next().unwrap_or("").trim();
        if mime.starts_with("audio/") {
            return mime.to_string();
        }
    }
    sniff(bytes)
        .map(|info| info.content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string()
}

#[cfg(test)]
pub(crate) fn test_wav(samples: usize) -> Vec<u8> {
    let sample_rate: u32 = 8000;
    let data_len = (samples * 2) as u32;
    let mut wav = Vec::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + data_len as usize, 0);
    wav
}
