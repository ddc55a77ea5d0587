use std::io;
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use libconfig::{LoadConfig, ReportFormat, Target};
use libruntime::report::{ConsoleRenderer, JsonRenderer, Renderer};

#[derive(Debug, Parser)]
#[command(name = "tcpload")]
#[command(about = "TCP load generator. Keep N workers busy -> Report round trips every interval", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the workers and report until interrupted
    Run(RunArgs),
    /// Validate given config
    #[command(arg_required_else_help = true)]
    Validate {
        #[arg(long, required = true, require_equals = true)]
        config: Option<String>,
    },
    /// Generates a config with default values
    #[command(arg_required_else_help = false)]
    Generate {
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "./tcpload.json")]
        path: Option<String>,
    },
    /// Export a json schema for the config
    #[command(arg_required_else_help = false)]
    Schema {
        #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "./schema.json")]
        path: Option<String>,
        #[arg(long, num_args = 0..=1, default_missing_value = "1")]
        version: Option<String>,
    },
}

#[derive(Debug, Args, Default)]
pub struct RunArgs {
    /// Config file, defaults apply when omitted
    #[arg(long, require_equals = true)]
    pub config: Option<String>,
    /// Target as host:port
    #[arg(long)]
    pub target: Option<Target>,
    /// Number of workers
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Reporting interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Per-cycle deadline in milliseconds
    #[arg(long, conflicts_with = "no_timeout")]
    pub timeout_ms: Option<u64>,
    /// Run cycles without a deadline
    #[arg(long)]
    pub no_timeout: bool,
    /// Stop after this many reports
    #[arg(long)]
    pub intervals: Option<u64>,
    #[arg(long, value_enum)]
    pub format: Option<Format>,
    #[arg(long)]
    pub no_color: bool,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Console,
    Json,
}

impl From<Format> for ReportFormat {
    fn from(value: Format) -> Self {
        match value {
            Format::Console => ReportFormat::Console,
            Format::Json => ReportFormat::Json,
        }
    }
}

impl RunArgs {
    /// File (or defaults) first, then flags on top, then the usual rules.
    pub fn into_config(self) -> anyhow::Result<LoadConfig> {
        let mut config = match &self.config {
            Some(path) => libconfig::parse_config(path)?,
            None => LoadConfig::default(),
        };

        if let Some(target) = self.target {
            config.target = target;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = Some(timeout_ms);
        }
        if self.no_timeout {
            config.timeout_ms = None;
        }
        if let Some(format) = self.format {
            config.report.format = format.into();
        }
        if self.no_color {
            config.report.color = false;
        }

        libconfig::validate_config(&config)?;
        Ok(config)
    }
}

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();

    match args.command {
        Commands::Run(run_args) => {
            let intervals = run_args.intervals;
            let config = run_args.into_config()?;
            run_load(&config, intervals)
        }
        Commands::Validate { config } => {
            let path = config.context("--config is required")?;
            libconfig::validate(&path)?;
            println!("ok");
            Ok(())
        }
        Commands::Generate { path } => {
            let path = path.unwrap_or_else(|| "./tcpload.json".to_string());
            libconfig::generate_config(&path)?;
            println!("Config written to {path}");
            Ok(())
        }
        Commands::Schema { path, version } => {
            let written = libconfig::export_schema(path.unwrap_or_else(|| "./schema.json".to_string()), version)?;
            println!("Schema exported to {}", written.display());
            Ok(())
        }
    }
}

fn renderer_for(config: &LoadConfig) -> Box<dyn Renderer> {
    match config.report.format {
        ReportFormat::Console => Box::new(ConsoleRenderer::new(io::stdout(), config.report.color)),
        ReportFormat::Json => Box::new(JsonRenderer::new(io::stdout())),
    }
}

pub fn run_load(config: &LoadConfig, intervals: Option<u64>) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    runtime.block_on(async {
        let (events, diagnostics) = libruntime::events::diagnostics();
        let mut renderer = renderer_for(config);
        let result = libruntime::run(config, intervals, &mut renderer, events).await;
        diagnostics.abort();
        result.context("Failed to write report")
    })
}
