pub mod age_bracket;
pub mod jobs;
pub mod materializer;
pub mod rank_calculator;

pub use jobs::{DEFAULT_JOB_LEASE, JobCoordinator, JobWorker};
pub use materializer::{MaterializationResult, Materializer};
pub use rank_calculator::{DEFAULT_LIMIT, RankedEntry, RankedResult, compute_ranks};
