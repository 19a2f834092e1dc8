//! 任务存储适配器

mod fs_job_store;

pub use fs_job_store::{FsJobStore, FINISHED_PREFIX};
