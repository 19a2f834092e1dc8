//! 领域层
//!
//! 纯业务逻辑：文本分段算法与任务/音色领域对象，不依赖任何基础设施

pub mod job;
pub mod text_segmenter;
