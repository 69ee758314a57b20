//! Holder configuration.
//!
//! Supports both explicit configuration through a bon builder and
//! environment variable fallbacks.

use bon::bon;

/// Behavioural switches of a [`KernelHolder`](crate::KernelHolder).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HolderConfig {
    /// Passed through to the compiler as its strict-mode flag.
    pub strict_compile: bool,
    /// Serialize concurrent misses on the same key.
    pub single_flight: bool,
    /// Abort construction on a malformed persisted record instead of skipping it.
    pub strict_cache_load: bool,
}

impl Default for HolderConfig {
    fn default() -> Self {
        Self { strict_compile: false, single_flight: true, strict_cache_load: false }
    }
}

#[bon]
impl HolderConfig {
    #[builder]
    pub fn new(
        #[builder(default = false)] strict_compile: bool,
        #[builder(default = true)] single_flight: bool,
        #[builder(default = false)] strict_cache_load: bool,
    ) -> Self {
        Self { strict_compile, single_flight, strict_cache_load }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `KILN_AOT_STRICT=1` - Ask the compiler for strict mode
    /// * `KILN_NO_SINGLE_FLIGHT` - Let concurrent misses compile independently
    /// * `KILN_STRICT_CACHE_LOAD` - Fail construction on malformed persisted records
    pub fn from_env() -> Self {
        let strict_compile = std::env::var("KILN_AOT_STRICT").is_ok_and(|v| v == "1");
        let single_flight = std::env::var("KILN_NO_SINGLE_FLIGHT").is_err();
        let strict_cache_load = std::env::var("KILN_STRICT_CACHE_LOAD").is_ok();

        Self { strict_compile, single_flight, strict_cache_load }
    }
}
