// Sequential, fail-soft batch execution with observable progress

pub mod executor;
pub mod types;

pub use executor::BatchExecutor;
pub use types::{
    BatchFailure, BatchObserver, BatchOptions, BatchProgress, BatchReport, BatchState,
    BatchSuccess, NoopObserver,
};
