//! Pulse Configuration Module
//!
//! Scheduler cadence, the ordered stage list, stage environment and the
//! anomaly policy, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `PULSE_CONFIG` environment variable (path to TOML file)
//! 2. `pulse_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(PulseConfig::load());
//! let interval = config::get().scheduler.interval_secs;
//! ```

mod pulse_config;
pub mod defaults;

pub use pulse_config::*;

use std::sync::OnceLock;

static PULSE_CONFIG: OnceLock<PulseConfig> = OnceLock::new();

/// Initialize the global configuration. Later calls are ignored.
pub fn init(config: PulseConfig) {
    if PULSE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global configuration.
///
/// Panics if `init()` has not been called: a missing config is a startup bug.
pub fn get() -> &'static PulseConfig {
    PULSE_CONFIG
        .get()
        .expect("config::get() called before config::init()")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    PULSE_CONFIG.get().is_some()
}
