//! Runner configuration.
//!
//! All runner behaviour is controlled through [`RunnerConfig`], built via
//! its [`RunnerConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tools and to diff two runs to
//! understand why their behaviour differs.
//!
//! # Design choice: builder over constructor
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use std::fmt;
use std::sync::Arc;

use crate::error::BatchError;
use crate::platform::PlatformSink;
use crate::progress::ProgressCallback;

/// Configuration for a [`crate::runner::BatchRunner`].
///
/// Built via [`RunnerConfig::builder()`] or [`RunnerConfig::default()`].
///
/// # Example
/// ```rust
/// use filebatch::RunnerConfig;
///
/// let config = RunnerConfig::builder()
///     .max_concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunnerConfig {
    /// Number of files processed concurrently. Default: 2.
    ///
    /// File conversion is memory-heavy (a decoded image is width × height
    /// × 4 bytes), so the default stays low. Raise it for small inputs or
    /// I/O-bound processors; a fast file never waits for a slow sibling —
    /// as each in-flight task settles, the next queued file starts.
    pub max_concurrency: usize,

    /// Progress/completion callback. Default: a no-op.
    pub progress_callback: Option<ProgressCallback>,

    /// Platform sink receiving downloads and notifications. Default: a
    /// filesystem sink writing into the current directory.
    pub sink: Option<Arc<dyn PlatformSink>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            progress_callback: None,
            sink: None,
        }
    }
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("max_concurrency", &self.max_concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .field("sink", &self.sink.as_ref().map(|_| "<dyn PlatformSink>"))
            .finish()
    }
}

impl RunnerConfig {
    /// Create a new builder for `RunnerConfig`.
    pub fn builder() -> RunnerConfigBuilder {
        RunnerConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`RunnerConfig`].
#[derive(Debug)]
pub struct RunnerConfigBuilder {
    config: RunnerConfig,
}

impl RunnerConfigBuilder {
    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.config.max_concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn PlatformSink>) -> Self {
        self.config.sink = Some(sink);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunnerConfig, BatchError> {
        if self.config.max_concurrency == 0 {
            return Err(BatchError::InvalidConfig(
                "max_concurrency must be >= 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_concurrency_is_two() {
        assert_eq!(RunnerConfig::default().max_concurrency, 2);
    }

    #[test]
    fn builder_clamps_zero_concurrency() {
        let config = RunnerConfig::builder().max_concurrency(0).build().unwrap();
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn debug_elides_trait_objects() {
        let out = format!("{:?}", RunnerConfig::default());
        assert!(out.contains("max_concurrency: 2"));
    }
}
