//! Request processing: the QA pipeline and the background job registry

pub mod jobs;
pub mod pipeline;

pub use jobs::{CancelToken, JobOutcome, JobRegistry, JobState, JobStatus};
pub use pipeline::{QaPipeline, RequestStage};
