//! Infrastructure Adapters - 端口的具体实现

pub mod audio;
pub mod gain;
pub mod store;
pub mod tts;

pub use audio::WavMerger;
pub use gain::FfmpegGainBooster;
pub use store::FsJobStore;
pub use tts::{FakeTtsClient, FakeTtsClientConfig, HttpTtsClient, HttpTtsClientConfig};
