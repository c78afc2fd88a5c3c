//! Drivers that run [`crate::CloneWorker`] over a list of repositories.
//!
//! [`SamplePipeline`] clones a small sample from the source table one at a
//! time and writes a fresh results table plus a log per repository.
//! [`RetryPipeline`] clones a fixed list concurrently and merges successes
//! into the persisted result set.

mod retry;
mod sample;

pub use retry::RetryPipeline;
pub use retry::RetryReport;
pub use sample::SamplePipeline;
pub use sample::SampleReport;
