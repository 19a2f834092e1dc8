//! 音频适配器

mod wav_merger;

pub use wav_merger::{encode_wav, WavMerger};
