use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LOREM_BLOCK: &str = "Lorem ipsum dolor sit amet consectetur adipiscing elit.
Quisque faucibus ex sapien vitae pellentesque sem placerat.
In id cursus mi pretium tellus duis convallis.
Tempus leo eu aenean sed diam urna tempor.
Pulvinar vivamus fringilla lacus nec metus bibendum egestas.
Iaculis massa nisl malesuada lacinia integer nunc posuere.
Ut hendrerit semper vel class aptent taciti sociosqu.
Ad litora torquent per conubia nostra inceptos himenaeos.
";

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct LoadConfig {
    pub version: u16,
    /// Number of workers, one slot each
    pub concurrency: usize,
    pub target: Target,
    /// Reporting interval
    pub interval_ms: u64,
    /// Deadline covering connect, write and read of one cycle. `null` disables it.
    pub timeout_ms: Option<u64>,
    pub payload: Payload,
    /// Size of the buffer a worker reads the response into
    pub read_buffer: usize,
    pub retry: RetryConfig,
    pub report: ReportConfig,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            version: 1,
            concurrency: 1000,
            target: Target::default(),
            interval_ms: 1000,
            timeout_ms: Some(5000),
            payload: Payload::default(),
            read_buffer: 1024,
            retry: RetryConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl LoadConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Default for Target {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8080,
        }
    }
}

impl Target {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected host:port, got \"{s}\""))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("invalid port \"{port}\": {e}"))?;
        Ok(Target {
            host: host.to_string(),
            port,
        })
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Text(String),
    Repeat { byte: u8, len: usize },
}

impl Default for Payload {
    fn default() -> Self {
        let mut text = String::from("\n");
        text.push_str(&[LOREM_BLOCK; 5].join("\n"));
        Payload::Text(text)
    }
}

impl Payload {
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            Payload::Text(text) => text.as_bytes().to_vec(),
            Payload::Repeat { byte, len } => vec![*byte; *len],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Repeat { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryConfig {
    /// Start the next cycle right after a failed one
    #[default]
    Immediate,
    /// Exponential delay after consecutive failures, reset on success
    Backoff {
        base_ms: u64,
        max_ms: u64,
        jitter: bool,
    },
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub color: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Console,
            color: true,
        }
    }
}
