use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Config file read when no explicit path is given. Absence is not an error.
pub const DEFAULT_CONFIG_PATH: &str = "config/txwatch.toml";

/// Prefix for environment overrides: `TXWATCH_{SECTION}_{KEY}`.
pub const ENV_PREFIX: &str = "TXWATCH";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

// ── Top-level config ──────────────────────────────────────────

/// Service configuration, layered defaults < TOML file < environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub detection: DetectionConfig,
}

impl Config {
    /// Resolve the full layered config.
    ///
    /// An explicit `path` must exist; without one, [`DEFAULT_CONFIG_PATH`] is
    /// used if present and defaults otherwise. `.env` is not read here; call
    /// [`load_dotenv`] first if it should contribute overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH)?,
            None => {
                tracing::info!("No config file found, using defaults and environment");
                Self::default()
            }
        };
        config.apply_overrides(|key| env::var(key).ok().filter(|v| !v.is_empty()));
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string. Missing keys keep their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load config from a file path (no environment overrides).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Apply `TXWATCH_{SECTION}_{KEY}` overrides resolved through `lookup`.
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let o = Overrides { lookup: &lookup };

        o.string("SERVER_HOST", &mut self.server.host);
        o.parsed("SERVER_PORT", &mut self.server.port);
        o.string("SERVER_CORS_ORIGIN", &mut self.server.cors_origin);

        let mut filepath = self.database.filepath.to_string_lossy().into_owned();
        o.string("DATABASE_FILEPATH", &mut filepath);
        self.database.filepath = PathBuf::from(filepath);
        o.parsed("DATABASE_MAX_OPEN_CONNS", &mut self.database.max_open_conns);
        o.parsed("DATABASE_MAX_IDLE_CONNS", &mut self.database.max_idle_conns);
        o.parsed("DATABASE_CONN_MAX_LIFETIME_SECS", &mut self.database.conn_max_lifetime_secs);
        o.parsed("DATABASE_BUSY_TIMEOUT_MS", &mut self.database.busy_timeout_ms);

        let d = &mut self.detection;
        o.parsed("DETECTION_CHANNEL_CAPACITY", &mut d.channel_capacity);
        o.parsed("DETECTION_LOOKUP_TIMEOUT_MS", &mut d.lookup_timeout_ms);
        o.parsed("DETECTION_POLICY", &mut d.policy);
        o.parsed("DETECTION_DRAIN_TIMEOUT_SECS", &mut d.drain_timeout_secs);
        o.parsed("DETECTION_HIGH_VOLUME_ENABLED", &mut d.high_volume.enabled);
        o.parsed("DETECTION_HIGH_VOLUME_THRESHOLD", &mut d.high_volume.threshold);
        o.parsed("DETECTION_FREQUENT_SMALL_ENABLED", &mut d.frequent_small.enabled);
        o.parsed("DETECTION_FREQUENT_SMALL_MAX_COUNT", &mut d.frequent_small.max_count);
        o.parsed("DETECTION_FREQUENT_SMALL_THRESHOLD_AMOUNT", &mut d.frequent_small.threshold_amount);
        o.parsed("DETECTION_FREQUENT_SMALL_WINDOW_SECS", &mut d.frequent_small.window_secs);
        o.parsed("DETECTION_RAPID_TRANSFERS_ENABLED", &mut d.rapid_transfers.enabled);
        o.parsed("DETECTION_RAPID_TRANSFERS_MIN_CONSECUTIVE", &mut d.rapid_transfers.min_consecutive);
        o.parsed("DETECTION_RAPID_TRANSFERS_WINDOW_SECS", &mut d.rapid_transfers.window_secs);
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.server.port == 0 {
            return invalid("server.port must be non-zero");
        }
        if self.database.filepath.as_os_str().is_empty() {
            return invalid("database.filepath must not be empty");
        }
        if self.database.max_open_conns == 0 {
            return invalid("database.max_open_conns must be at least 1");
        }
        if self.database.max_idle_conns > self.database.max_open_conns {
            return invalid("database.max_idle_conns must not exceed database.max_open_conns");
        }
        if self.detection.channel_capacity == 0 {
            return invalid("detection.channel_capacity must be at least 1");
        }
        if self.detection.lookup_timeout_ms == 0 {
            return invalid("detection.lookup_timeout_ms must be non-zero");
        }
        if self.detection.frequent_small.window_secs == 0 {
            return invalid("detection.frequent_small.window_secs must be non-zero");
        }
        if self.detection.rapid_transfers.window_secs == 0 {
            return invalid("detection.rapid_transfers.window_secs must be non-zero");
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let d = &self.detection;
        tracing::info!("Config loaded:");
        tracing::info!("  server:     {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  database:   file={}, max_open={}, max_idle={}",
            self.database.filepath.display(),
            self.database.max_open_conns,
            self.database.max_idle_conns
        );
        tracing::info!(
            "  detection:  policy={}, channel_capacity={}, lookup_timeout={}ms",
            d.policy,
            d.channel_capacity,
            d.lookup_timeout_ms
        );
        tracing::info!(
            "  rules:      high_volume={} frequent_small={} rapid_transfers={}",
            d.high_volume.enabled,
            d.frequent_small.enabled,
            d.rapid_transfers.enabled
        );
    }
}

struct Overrides<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Overrides<'_, F> {
    fn get(&self, key: &str) -> Option<(String, String)> {
        let name = format!("{}_{}", ENV_PREFIX, key);
        (self.lookup)(&name).map(|v| (name, v))
    }

    fn string(&self, key: &str, target: &mut String) {
        if let Some((_, v)) = self.get(key) {
            *target = v;
        }
    }

    fn parsed<T: FromStr>(&self, key: &str, target: &mut T) {
        if let Some((name, v)) = self.get(key) {
            match v.parse() {
                Ok(parsed) => *target = parsed,
                Err(_) => tracing::warn!("Ignoring unparsable {}={:?}", name, v),
            }
        }
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "*".to_string(),
        }
    }
}

// ── Database ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`.
    pub filepath: PathBuf,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
    /// 0 keeps connections for the life of the pool.
    pub conn_max_lifetime_secs: u64,
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn in_memory() -> Self {
        Self {
            filepath: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.filepath.as_os_str() == ":memory:"
    }

    pub fn conn_max_lifetime(&self) -> Option<Duration> {
        match self.conn_max_lifetime_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            filepath: PathBuf::from("./data/transactions.db"),
            max_open_conns: 1,
            max_idle_conns: 1,
            conn_max_lifetime_secs: 0,
            busy_timeout_ms: 5_000,
        }
    }
}

// ── Detection ─────────────────────────────────────────────────

/// How a detection pass reacts to a rule that fails to evaluate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationPolicy {
    /// Abort the pass on the first rule error; nothing is persisted.
    #[default]
    FailFast,
    /// Log the failing rule, skip it, and keep evaluating the rest.
    BestEffort,
}

impl std::fmt::Display for EvaluationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FailFast => f.write_str("fail-fast"),
            Self::BestEffort => f.write_str("best-effort"),
        }
    }
}

impl FromStr for EvaluationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "best-effort" => Ok(Self::BestEffort),
            other => Err(ConfigError::Invalid(format!("unknown evaluation policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Capacity of the ingestion → detection handoff. Publishing blocks when full.
    pub channel_capacity: usize,
    /// Upper bound on each rule's historical store lookup.
    pub lookup_timeout_ms: u64,
    pub policy: EvaluationPolicy,
    /// How long shutdown waits for queued transactions to be evaluated.
    pub drain_timeout_secs: u64,
    pub high_volume: HighVolumeConfig,
    pub frequent_small: FrequentSmallConfig,
    pub rapid_transfers: RapidTransfersConfig,
}

impl DetectionConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            lookup_timeout_ms: 5_000,
            policy: EvaluationPolicy::FailFast,
            drain_timeout_secs: 5,
            high_volume: HighVolumeConfig::default(),
            frequent_small: FrequentSmallConfig::default(),
            rapid_transfers: RapidTransfersConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighVolumeConfig {
    pub enabled: bool,
    pub threshold: f64,
}

impl Default for HighVolumeConfig {
    fn default() -> Self {
        Self { enabled: true, threshold: 10_000.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequentSmallConfig {
    pub enabled: bool,
    pub max_count: usize,
    pub threshold_amount: f64,
    pub window_secs: u64,
}

impl FrequentSmallConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for FrequentSmallConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_count: 5,
            threshold_amount: 100.0,
            window_secs: 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapidTransfersConfig {
    pub enabled: bool,
    pub min_consecutive: usize,
    pub window_secs: u64,
}

impl RapidTransfersConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RapidTransfersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_consecutive: 3,
            window_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.filepath, PathBuf::from("./data/transactions.db"));
        assert_eq!(config.database.conn_max_lifetime(), None);
        assert_eq!(config.detection.lookup_timeout(), Duration::from_secs(5));
        assert_eq!(config.detection.policy, EvaluationPolicy::FailFast);
    }

    #[test]
    fn toml_overrides_defaults_per_key() {
        let config = Config::from_toml(
            r#"
[server]
port = 9090

[database]
filepath = "/tmp/tx.db"
max_open_conns = 4
conn_max_lifetime_secs = 60

[detection]
policy = "best-effort"

[detection.frequent_small]
max_count = 10
"#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.max_open_conns, 4);
        assert_eq!(config.database.max_idle_conns, 1);
        assert_eq!(config.database.conn_max_lifetime(), Some(Duration::from_secs(60)));
        assert_eq!(config.detection.policy, EvaluationPolicy::BestEffort);
        assert_eq!(config.detection.frequent_small.max_count, 10);
        assert_eq!(config.detection.frequent_small.threshold_amount, 100.0);
    }

    #[test]
    fn environment_beats_file() {
        let mut config = Config::from_toml("[server]\nport = 9090\n").unwrap();
        config.apply_overrides(lookup(&[
            ("TXWATCH_SERVER_PORT", "7000"),
            ("TXWATCH_DATABASE_FILEPATH", ":memory:"),
            ("TXWATCH_DETECTION_POLICY", "best-effort"),
            ("TXWATCH_DETECTION_HIGH_VOLUME_THRESHOLD", "2500.5"),
            ("TXWATCH_DETECTION_RAPID_TRANSFERS_ENABLED", "false"),
        ]));

        assert_eq!(config.server.port, 7000);
        assert!(config.database.is_in_memory());
        assert_eq!(config.detection.policy, EvaluationPolicy::BestEffort);
        assert_eq!(config.detection.high_volume.threshold, 2500.5);
        assert!(!config.detection.rapid_transfers.enabled);
    }

    #[test]
    fn unparsable_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("TXWATCH_SERVER_PORT", "not-a-port"),
            ("TXWATCH_DETECTION_POLICY", "yolo"),
        ]));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.detection.policy, EvaluationPolicy::FailFast);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.detection.channel_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.database.max_idle_conns = 2;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("txwatch.toml");
        std::fs::write(&path, "[detection.high_volume]\nthreshold = 500.0\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.detection.high_volume.threshold, 500.0);
    }
}
