mod enqueue;
mod management;
mod structs;

pub use enqueue::{DEFAULT_PRIORITY, EnqueueOptions, enqueue, enqueue_analysis};
pub use management::{
    claim_next_job, reclaim_stalled, trim_finished, update_job_on_completion,
    update_job_on_failure,
};
pub use structs::{
    AnalysisJobPayload, AnalyticsJobPayload, Backoff, BackoffKind, Job, JobStatus, QueueName,
};
