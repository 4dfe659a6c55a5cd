//! Engine configuration.
//!
//! Settings carry the tunable knobs of every solver and the cache. Each
//! field maps to one environment key; `from_env` reads the process
//! environment and falls back to the default for missing or unparsable
//! values.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

/// Tunable engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Start-time grid step for domain generation (`QUANTUM_MINUTES`).
    pub quantum_minutes: i64,
    /// CP oracle time limit (`CPSAT_TIME_LIMIT_MS`).
    pub cpsat_time_limit_ms: u64,
    /// Backtracking search wall-clock budget (`BACKTRACK_TIME_LIMIT_MS`).
    pub backtrack_time_limit_ms: u64,
    /// Tabu move memory length (`TABU_TENURE`).
    pub tabu_tenure: usize,
    /// Tabu iteration budget (`TABU_MAX_ITER`).
    pub tabu_max_iter: usize,
    /// Cached schedule lifetime (`CACHE_TTL_SECONDS`).
    pub cache_ttl_seconds: u64,
    /// Task count below which `auto` picks backtracking
    /// (`SELECTOR_BACKTRACK_THRESHOLD`).
    pub selector_backtrack_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quantum_minutes: 15,
            cpsat_time_limit_ms: 10_000,
            backtrack_time_limit_ms: 30_000,
            tabu_tenure: 10,
            tabu_max_iter: 100,
            cache_ttl_seconds: 3600,
            selector_backtrack_threshold: 15,
        }
    }
}

impl Settings {
    /// Reads settings from the process environment.
    ///
    /// Unset keys keep their defaults; unparsable values are logged and
    /// replaced by defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quantum_minutes: read_env("QUANTUM_MINUTES", defaults.quantum_minutes),
            cpsat_time_limit_ms: read_env("CPSAT_TIME_LIMIT_MS", defaults.cpsat_time_limit_ms),
            backtrack_time_limit_ms: read_env(
                "BACKTRACK_TIME_LIMIT_MS",
                defaults.backtrack_time_limit_ms,
            ),
            tabu_tenure: read_env("TABU_TENURE", defaults.tabu_tenure),
            tabu_max_iter: read_env("TABU_MAX_ITER", defaults.tabu_max_iter),
            cache_ttl_seconds: read_env("CACHE_TTL_SECONDS", defaults.cache_ttl_seconds),
            selector_backtrack_threshold: read_env(
                "SELECTOR_BACKTRACK_THRESHOLD",
                defaults.selector_backtrack_threshold,
            ),
        }
    }

    /// CP oracle time limit as a `Duration`.
    pub fn cpsat_time_limit(&self) -> Duration {
        Duration::from_millis(self.cpsat_time_limit_ms)
    }

    /// Backtracking budget as a `Duration`.
    pub fn backtrack_time_limit(&self) -> Duration {
        Duration::from_millis(self.backtrack_time_limit_ms)
    }

    /// Cache TTL as a `Duration`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn read_env<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("ignoring unparsable {key}='{raw}', using default");
                default
            }
        },
        Err(_) => default,
    }
}
