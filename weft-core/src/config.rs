//! Option bags for instrumentation, computations, and watches.
//!
//! All options deserialize with per-field defaults so a host can keep them in
//! its own configuration files and only spell out what it changes.

use serde::{Deserialize, Serialize};

/// Options applied to a facade when a container is instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentOptions {
    /// Wrap nested containers on the way out of reads.
    pub deep: bool,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self { deep: true }
    }
}

impl InstrumentOptions {
    /// Options for a facade that hands nested containers back raw.
    pub fn shallow() -> Self {
        Self { deep: false }
    }
}

/// Options for a [`Computed`](crate::reactive::Computed) node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedOptions {
    /// Cache the last successful result until a dependency changes.
    pub cache: bool,

    /// Human-readable name used in errors and logs.
    pub label: Option<String>,
}

impl Default for ComputedOptions {
    fn default() -> Self {
        Self {
            cache: true,
            label: None,
        }
    }
}

/// Options for [`watch`](crate::reactive::watch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Snapshot the selected value so the handler sees structural copies.
    pub deep: bool,

    /// Call the handler once with the initial value when the watch starts.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }
}
