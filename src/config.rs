use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SNAPSHOT_DIR: &str = ".docstruct";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 100;

/// How often a processing job is polled and when to give up on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(with = "duration_millis")]
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// External program that answers collaborator calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub program: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl BridgeConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.program.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbenchConfig {
    pub snapshot_dir: PathBuf,
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            bridge: BridgeConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl WorkbenchConfig {
    pub fn new(snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_dir: snapshot_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn poll_defaults_match_job_lifecycle() {
        let poll = PollConfig::default();
        assert_eq!(poll.interval, Duration::from_secs(3));
        assert_eq!(poll.max_attempts, 100);
        assert_eq!(poll.with_max_attempts(0).max_attempts, 1);
    }

    #[test]
    fn config_reads_interval_in_milliseconds() {
        let config: WorkbenchConfig = serde_json::from_str(
            r#"{"snapshot_dir": "/tmp/snaps", "poll": {"interval": 500, "max_attempts": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.poll.interval, Duration::from_millis(500));
        assert!(!config.bridge.is_configured());
    }
}
