pub mod rankings_cache;
pub mod rankings_jobs;
pub mod records;

pub use rankings_cache::RankingsCacheRepository;
pub use rankings_jobs::RankingsJobRepository;
pub use records::RecordRepository;
