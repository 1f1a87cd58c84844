//! Configuration builders controlling mining and corpus ingestion.

use crate::error::{Result, TokmineError};
use serde::{Deserialize, Serialize};

/// Default target Hamming distance for template mining.
pub const DEFAULT_TARGET_DISTANCE: usize = 2;

/// Configuration for a template mining run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinerConfig {
    /// Hamming distance a seed pair must match exactly.
    pub target_distance: usize,
    /// Hard cap on mining iterations; `None` runs until no pair qualifies.
    pub max_iterations: Option<usize>,
    /// Enables per-iteration logging through the `log` facade.
    pub show_progress: bool,
}

impl MinerConfig {
    /// Returns a builder initialised with [`MinerConfig::default`].
    #[must_use]
    pub fn builder() -> MinerBuilder {
        MinerBuilder::default()
    }

    /// Validates the invariants required for mining.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == Some(0) {
            return Err(TokmineError::InvalidConfig(
                "max_iterations must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            target_distance: DEFAULT_TARGET_DISTANCE,
            max_iterations: None,
            show_progress: true,
        }
    }
}

/// Builder for [`MinerConfig`].
#[derive(Debug, Default, Clone)]
pub struct MinerBuilder {
    cfg: MinerConfig,
}

impl MinerBuilder {
    /// Creates a builder with [`MinerConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target Hamming distance.
    ///
    /// A distance of zero is accepted and degenerates to exact-duplicate
    /// grouping: the mined rules carry no wildcard positions.
    #[must_use]
    pub fn target_distance(mut self, value: usize) -> Self {
        self.cfg.target_distance = value;
        self
    }

    /// Sets a hard mining iteration limit.
    #[must_use]
    pub fn max_iterations(mut self, value: Option<usize>) -> Self {
        self.cfg.max_iterations = value;
        self
    }

    /// Enables or disables per-iteration logging.
    #[must_use]
    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.cfg.show_progress = enabled;
        self
    }

    /// Finalises the builder, returning a validated [`MinerConfig`].
    pub fn build(self) -> Result<MinerConfig> {
        self.cfg.validate()?;
        Ok(self.cfg)
    }
}

/// Configuration controlling how input files are discovered on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestConfig {
    /// Enables recursive directory traversal.
    pub recursive: bool,
    /// Follows symlinks encountered during traversal.
    pub follow_symlinks: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            follow_symlinks: false,
        }
    }
}

impl IngestConfig {
    /// Returns a builder initialised with [`IngestConfig::default`].
    #[must_use]
    pub fn builder() -> IngestBuilder {
        IngestBuilder::default()
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug, Default, Clone)]
pub struct IngestBuilder {
    cfg: IngestConfig,
}

impl IngestBuilder {
    /// Creates a new builder with [`IngestConfig::default`] settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables recursive directory traversal.
    #[must_use]
    pub fn recursive(mut self, enabled: bool) -> Self {
        self.cfg.recursive = enabled;
        self
    }

    /// Enables or disables following of symlinks when traversing directories.
    #[must_use]
    pub fn follow_symlinks(mut self, enabled: bool) -> Self {
        self.cfg.follow_symlinks = enabled;
        self
    }

    /// Finalises the builder, returning the [`IngestConfig`].
    pub fn build(self) -> IngestConfig {
        self.cfg
    }
}
