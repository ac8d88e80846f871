//! Executor configuration

/// Upper bound on captured backend stderr, to keep failed results bounded
pub const DEFAULT_MAX_STDERR_BYTES: usize = 64 * 1024;

/// Default Execute-phase ceiling when the request does not set one
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 1800;

/// Configuration for the build executor
#[derive(Debug, Clone)]
pub struct BuildExecutorConfig {
    /// Execute-phase timeout applied when the request carries none.
    /// `None` disables the default ceiling entirely.
    pub default_timeout_seconds: Option<u64>,
    /// Captured stderr is truncated to this many bytes on backend failure
    pub max_stderr_bytes: usize,
}

impl Default for BuildExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
            max_stderr_bytes: DEFAULT_MAX_STDERR_BYTES,
        }
    }
}

impl BuildExecutorConfig {
    /// Disable the default Execute-phase timeout
    #[must_use]
    pub fn without_default_timeout(mut self) -> Self {
        self.default_timeout_seconds = None;
        self
    }

    /// Set the stderr capture bound
    #[must_use]
    pub fn with_max_stderr_bytes(mut self, bytes: usize) -> Self {
        self.max_stderr_bytes = bytes;
        self
    }
}
