//! WAV Merger - 基于 symphonia 的片段合并器
//!
//! 把有序的片段 WAV 文件解码为 PCM，沿时间轴拼接后重新编码为
//! 单个 16-bit PCM WAV。不做重采样：采样率/声道数不一致视为错误

use async_trait::async_trait;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioMergerPort, MergeError, MergeInfo};

/// 解码后的 PCM 数据
struct DecodedAudio {
    /// 交织的 f32 样本
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u8,
}

/// 使用 symphonia 解码 WAV 得到 PCM 样本
fn decode_wav_to_pcm(data: &[u8]) -> Result<DecodedAudio, MergeError> {
    let cursor = Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("wav");

    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| MergeError::DecodingError(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| MergeError::DecodingError("No audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| MergeError::DecodingError("Unknown sample rate".to_string()))?;

    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u8)
        .ok_or_else(|| MergeError::DecodingError("Unknown channel count".to_string()))?;

    let decoder_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| MergeError::DecodingError(format!("Decoder creation failed: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let track_id = track.id;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(MergeError::DecodingError(format!(
                    "Packet read error: {}",
                    e
                )));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        // 只取实际样本，不取整个缓冲容量
        let actual_samples = num_frames * spec.channels.count();
        samples.extend(&sample_buf.samples()[..actual_samples]);
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// 将 f32 PCM 样本编码为 16-bit PCM WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = channels * (bits_per_sample / 8);

    // f32 样本转 i16
    let pcm_data: Vec<i16> = samples
        .iter()
        .map(|&s| {
            let clamped = s.clamp(-1.0, 1.0);
            (clamped * 32767.0) as i16
        })
        .collect();

    let data_size = pcm_data.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());

    // PCM data
    for sample in pcm_data {
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}

/// WAV 合并器
#[derive(Debug, Default)]
pub struct WavMerger;

impl WavMerger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioMergerPort for WavMerger {
    async fn merge(&self, segments: &[PathBuf], output: &Path) -> Result<MergeInfo, MergeError> {
        if segments.is_empty() {
            return Err(MergeError::NoInput);
        }

        let mut all_samples: Vec<f32> = Vec::new();
        let mut sample_rate: Option<u32> = None;
        let mut channels: Option<u8> = None;

        for path in segments {
            let data = tokio::fs::read(path)
                .await
                .map_err(|e| MergeError::IoError(format!("{}: {}", path.display(), e)))?;
            let decoded = decode_wav_to_pcm(&data)?;

            match sample_rate {
                None => sample_rate = Some(decoded.sample_rate),
                Some(expected) if expected != decoded.sample_rate => {
                    return Err(MergeError::SampleRateMismatch {
                        path: path.display().to_string(),
                        expected,
                        actual: decoded.sample_rate,
                    });
                }
                Some(_) => {}
            }
            match channels {
                None => channels = Some(decoded.channels),
                Some(expected) if expected != decoded.channels => {
                    return Err(MergeError::ChannelMismatch {
                        path: path.display().to_string(),
                        expected,
                        actual: decoded.channels,
                    });
                }
                Some(_) => {}
            }

            all_samples.extend(decoded.samples);
        }

        // segments 非空时两者必然已赋值
        let sample_rate = sample_rate.unwrap_or(0);
        let channels = channels.unwrap_or(1);

        let wav = encode_wav(&all_samples, sample_rate, channels as u16);
        tokio::fs::write(output, &wav)
            .await
            .map_err(|e| MergeError::IoError(format!("{}: {}", output.display(), e)))?;

        let duration_ms = if sample_rate > 0 && channels > 0 {
            (all_samples.len() as u64 * 1000) / (sample_rate as u64 * channels as u64)
        } else {
            0
        };

        tracing::debug!(
            output = %output.display(),
            segments = segments.len(),
            total_samples = all_samples.len(),
            "Wrote merged WAV"
        );

        Ok(MergeInfo {
            sample_rate,
            total_samples: all_samples.len(),
            duration_ms,
            segment_count: segments.len(),
        })
    }
}
