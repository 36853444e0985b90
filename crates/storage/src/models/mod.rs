pub mod event;
pub mod filter;
pub mod performance;
pub mod ranking_cache;
pub mod ranking_job;
pub mod region;

pub use event::{Course, EVENT_DISTANCES, Gender, Stroke};
pub use filter::{AgeGroup, FilterPayload, FilterTuple, WILDCARD};
pub use performance::PerformanceRecord;
pub use ranking_cache::{CacheRecord, NewCacheRecord};
pub use ranking_job::{JobStatus, LEASE_EXPIRED, RankingJob};
pub use region::{Lsc, REGIONS, Region};
