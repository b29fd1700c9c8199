use config::{Config, Environment};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Actix worker count, defaults to the number of physical cores
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Yaml or json file holding folders, creatives and code tables
    pub path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("snapshot.yaml"),
            refresh_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct RecallConfig {
    /// Redis shard urls, one shard each. Empty runs `shards` in
    /// process shards instead, which only serve wins seen by the same
    /// instance that bid.
    pub urls: Vec<String>,
    pub shards: usize,
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Collision retries before an allocation gives up
    pub max_attempts: u32,
    /// Total entries across all shards
    pub max_capacity: u64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            shards: 4,
            ttl: Duration::from_secs(600),
            max_attempts: 5,
            max_capacity: 4_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
#[serde(default)]
pub struct CodecConfig {
    /// Blowfish key, 4 to 56 bytes
    pub key: String,
    /// Cbc iv, exactly 8 bytes
    pub iv: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct BiddingConfig {
    /// Percent of the folder cpc bid to the exchange
    pub revenue_share: f64,
    /// Only answer test traffic
    pub test_only: bool,
}

impl Default for BiddingConfig {
    fn default() -> Self {
        Self {
            revenue_share: 98.0,
            test_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct EventConfig {
    /// The public domain to be used when building win notice urls
    pub domain: String,
    /// The path win notices arrive on, e.g. /win
    pub win_path: String,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            domain: "localhost:8080".to_string(),
            win_path: "/win".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(default)]
#[serde(default)]
pub struct ReconcilerConfig {
    pub max_batch: usize,
    /// How long a partial batch waits after its first notice
    #[serde(with = "humantime_serde")]
    pub batch_timeout: Duration,
    /// Win notices buffered before the handler waits on the batcher
    pub queue_depth: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_batch: 100,
            batch_timeout: Duration::from_secs(10),
            queue_depth: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LedgerConfig {
    #[default]
    Memory,
    Postgres {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
        acquire_timeout: Duration,
    },
}

fn default_max_connections() -> u32 {
    8
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default, Builder)]
#[builder(default)]
pub struct RdspConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    pub codec: CodecConfig,
    #[serde(default)]
    pub bidding: BiddingConfig,
    #[serde(default)]
    pub notifications: EventConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OtelProto {
    Http,
    #[default]
    Grpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LogSink {
    Stdout {
        #[serde(default = "default_true")]
        color: bool,
        #[serde(default)]
        json: bool,
        #[serde(default = "default_true")]
        spans: bool,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        json: bool,
        #[serde(default)]
        rotation: FileRotation,
        #[serde(default)]
        max_files: usize,
        #[serde(default = "default_true")]
        spans: bool,
    },
    Otel {
        #[serde(default)]
        endpoint: String,
        #[serde(default)]
        proto: OtelProto,
        #[serde(default = "default_true")]
        metrics: bool,
        #[serde(default = "default_metrics_interval")]
        metrics_interval_secs: u32,
    },
}

fn default_true() -> bool {
    true
}

fn default_metrics_interval() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_sample_rate")]
    pub span_sample_rate: f32,
    #[serde(default = "default_sinks")]
    pub sinks: Vec<LogSink>,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_sample_rate() -> f32 {
    0.01
}

fn default_sinks() -> Vec<LogSink> {
    vec![LogSink::Stdout {
        color: true,
        json: false,
        spans: false,
    }]
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            span_sample_rate: default_sample_rate(),
            sinks: default_sinks(),
        }
    }
}

impl LoggingConfig {
    /// Validates the logging configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.sinks.is_empty() {
            anyhow::bail!("At least one logging sink must be configured");
        }

        self.level.parse::<tracing::Level>().map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level: '{}'. Valid levels: trace, debug, info, warn, error",
                self.level
            )
        })?;

        if !(0.0..=1.0).contains(&self.span_sample_rate) {
            anyhow::bail!(
                "span_sample_rate must be between 0.0 and 1.0, got {}",
                self.span_sample_rate
            );
        }

        Ok(())
    }
}

impl RdspConfig {
    /// Loads the config file, overlaid with `RDSP__SECTION__KEY`
    /// environment variables
    pub fn load(path: &Path) -> Result<RdspConfig, anyhow::Error> {
        let cfg = Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(
                Environment::with_prefix("RDSP")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let cfg: RdspConfig = cfg.try_deserialize()?;
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.recall.urls.is_empty() && self.recall.shards == 0 {
            anyhow::bail!("recall.shards must be at least 1");
        }

        if self.recall.max_attempts == 0 {
            anyhow::bail!("recall.max_attempts must be at least 1");
        }

        if self.reconciler.max_batch == 0 || self.reconciler.queue_depth == 0 {
            anyhow::bail!("reconciler.max_batch and reconciler.queue_depth must be at least 1");
        }

        self.logging.validate()
    }
}
