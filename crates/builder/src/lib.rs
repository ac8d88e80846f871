#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build orchestration for wheelwright
//!
//! This crate drives one build request through the linear pipeline
//! (Resolve, Analyze, Provision, Execute, Validate, Publish), applies the
//! safety validator to everything the backend produces, and publishes
//! validated artifacts atomically into the destination directory.

mod config;
mod executor;
mod metadata;
pub mod publish;
pub mod validation;

pub use config::{BuildExecutorConfig, DEFAULT_MAX_STDERR_BYTES, DEFAULT_TIMEOUT_SECONDS};
pub use executor::BuildExecutor;
pub use metadata::{MetadataProvider, StaticMetadata};
pub use publish::{clean_stale_artifacts, guard_destination};
pub use validation::{validate_archive, validate_mounts};
