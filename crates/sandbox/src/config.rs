//! Sandbox configuration from environment variables and arguments.

use std::env;
use std::path::PathBuf;

/// Runtime options of the sandbox.
#[derive(Clone, Debug)]
pub struct SandboxConfig {
    /// Directory holding `config.toml`, `calculations.ron`, `effects.ron`
    /// and `sources.ron`. `None` uses the bundled data.
    pub data_dir: Option<PathBuf>,
    /// Periodic executions run while standing in each source.
    pub ticks: u32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            ticks: 3,
        }
    }
}

impl SandboxConfig {
    /// Reads `STATS_DATA_DIR` and `STATS_SANDBOX_TICKS`; a first positional
    /// argument overrides the data directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = read_env::<PathBuf>("STATS_DATA_DIR") {
            config.data_dir = Some(dir);
        }
        if let Some(ticks) = read_env::<u32>("STATS_SANDBOX_TICKS") {
            config.ticks = ticks;
        }
        if let Some(dir) = env::args().nth(1) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}
