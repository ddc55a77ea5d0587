use crate::schema::{LoadConfig, RetryConfig};
use crate::ValidationError;

enum ConfigVersion {
    V1 = 1,
}
impl TryFrom<u16> for ConfigVersion {
    type Error = ();
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ConfigVersion::V1),
            _ => Err(()),
        }
    }
}

pub struct Validator {
    rules: Vec<Box<dyn Rule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Every rule the loader applies
    pub fn standard() -> Self {
        Validator::new()
            .with_rule(VersionRule::new())
            .with_rule(ConcurrencyRule::new())
            .with_rule(TargetRule::new())
            .with_rule(IntervalRule::new())
            .with_rule(TimeoutRule::new())
            .with_rule(PayloadRule::new())
            .with_rule(ReadBufferRule::new())
            .with_rule(RetryRule::new())
    }

    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        for r in &self.rules {
            r.validate(config, errors);
        }
    }
}

pub trait Rule: Send + Sync {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>);
}

fn push(errors: &mut Vec<ValidationError>, path: &str, code: &str, message: &str) {
    errors.push(ValidationError {
        path: path.to_string(),
        code: code.to_string(),
        message: message.to_string(),
    })
}

pub(crate) struct VersionRule;

impl VersionRule {
    pub(crate) fn new() -> Self {
        VersionRule
    }
}

impl Rule for VersionRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if ConfigVersion::try_from(config.version).is_err() {
            push(
                errors,
                "/version",
                "unsupported_version",
                &format!("Unsupported version: {}", config.version),
            );
        }
    }
}

pub(crate) struct ConcurrencyRule {
    message: String,
}

impl ConcurrencyRule {
    pub(crate) fn new() -> Self {
        ConcurrencyRule { message: "concurrency must be >= 1 and <= 100_000".to_string() }
    }
}

impl Rule for ConcurrencyRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.concurrency == 0 || config.concurrency > 100_000 {
            push(errors, "/concurrency", "out_of_range", &self.message);
        }
    }
}

pub(crate) struct TargetRule;

impl TargetRule {
    pub(crate) fn new() -> Self {
        TargetRule
    }
}

impl Rule for TargetRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.target.host.trim().is_empty() {
            push(errors, "/target/host", "required", "host must not be empty");
        }
        if config.target.port == 0 {
            push(errors, "/target/port", "out_of_range", "port must be > 0");
        }
    }
}

pub(crate) struct IntervalRule {
    message: String,
}

impl IntervalRule {
    pub(crate) fn new() -> Self {
        IntervalRule { message: "interval_ms must be >= 10 and <= 3_600_000".to_string() }
    }
}

impl Rule for IntervalRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.interval_ms < 10 || config.interval_ms > 3_600_000 {
            push(errors, "/interval_ms", "out_of_range", &self.message);
        }
    }
}

pub(crate) struct TimeoutRule;

impl TimeoutRule {
    pub(crate) fn new() -> Self {
        TimeoutRule
    }
}

impl Rule for TimeoutRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.timeout_ms == Some(0) {
            push(
                errors,
                "/timeout_ms",
                "out_of_range",
                "timeout_ms must be > 0, use null to disable the deadline",
            );
        }
    }
}

pub(crate) struct PayloadRule;

impl PayloadRule {
    pub(crate) fn new() -> Self {
        PayloadRule
    }
}

impl Rule for PayloadRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.payload.is_empty() {
            push(errors, "/payload", "required", "payload must not be empty");
        }
    }
}

pub(crate) struct ReadBufferRule {
    message: String,
}

impl ReadBufferRule {
    pub(crate) fn new() -> Self {
        ReadBufferRule { message: "read_buffer must be >= 1 and <= 1_048_576".to_string() }
    }
}

impl Rule for ReadBufferRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if config.read_buffer == 0 || config.read_buffer > 1_048_576 {
            push(errors, "/read_buffer", "out_of_range", &self.message);
        }
    }
}

pub(crate) struct RetryRule;

impl RetryRule {
    pub(crate) fn new() -> Self {
        RetryRule
    }
}

impl Rule for RetryRule {
    fn validate(&self, config: &LoadConfig, errors: &mut Vec<ValidationError>) {
        if let RetryConfig::Backoff { base_ms, max_ms, .. } = config.retry {
            if base_ms == 0 {
                push(errors, "/retry/base_ms", "out_of_range", "base_ms must be > 0");
            }
            if base_ms > max_ms {
                push(errors, "/retry/max_ms", "out_of_range", "max_ms must be >= base_ms");
            }
        }
    }
}
