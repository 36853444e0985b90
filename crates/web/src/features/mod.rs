pub mod jobs;
pub mod rankings;
pub mod regions;
