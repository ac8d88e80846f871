#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Build isolation for wheelwright
//!
//! This crate owns the two security-critical decisions at the bottom of the
//! pipeline: which pinned execution environment a request resolves to, and
//! how the build command runs inside a throwaway context. Two backends sit
//! behind one capability interface: an ephemeral virtualenv and a
//! containerized variant driving manylinux/musllinux images.

pub mod backend;
pub mod container;
pub mod images;
pub mod script;
pub mod spec;
pub mod variables;
pub mod venv;

pub use backend::{
    active_contexts, BuildCommand, ExecutionOutput, IsolationBackend, IsolationContext, MountSpec,
    ResourceLimits,
};
pub use container::ContainerBackend;
pub use images::{
    available_keys_list, canonical_arch, container_interpreter, resolve_image, short_version,
    supported_versions_list, validate_runtime_version, DEFAULT_PLATFORM,
    SUPPORTED_RUNTIME_VERSIONS,
};
pub use script::{
    generate_build_script, CONTAINER_OUTPUT_DIR, CONTAINER_SOURCE_DIR, SCRIPT_NAME,
};
pub use spec::{select_host_environment, select_image_environment, EnvironmentId, EnvironmentSpec};
pub use variables::{baseline_env, merge_env, BASELINE_KEYS};
pub use venv::VenvBackend;
