//! Root of the `census-core` library.

// Prevent accidental direct writes to stdout/stderr in library code. All
// user-visible output must go through a ProgressReporter or the tracing
// stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

mod clone;
pub mod clone_log;
pub mod config;
pub mod error;
pub mod pipeline;
mod process_group;
pub mod progress;
mod repository;
pub mod result_set;
mod sample_results;
pub mod sources;
mod spawn;

pub use clone::CloneOptions;
pub use clone::CloneOutcome;
pub use clone::CloneStatus;
pub use clone::CloneWorker;
pub use config::Config;
pub use config::ConfigOverrides;
pub use error::CensusErr;
pub use pipeline::RetryPipeline;
pub use pipeline::RetryReport;
pub use pipeline::SamplePipeline;
pub use pipeline::SampleReport;
pub use progress::PipelineEvent;
pub use progress::ProgressReporter;
pub use progress::SilentReporter;
pub use repository::RepositoryId;
pub use repository::RepositoryRecord;
pub use result_set::PersistedResultSet;
pub use result_set::ResultRecord;
pub use sample_results::write_sample_results;
