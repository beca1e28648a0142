use crate::prelude::*;
use clap::Parser;
use tabhead_core::PipelineConfig;

mod discovery;
mod error;
mod extract;
mod inspect;
mod prelude;
mod report;
mod runner;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Infer the column-header row of tabular PDF reports"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// TOML file overriding pipeline defaults
    #[clap(long, env = "TABHEAD_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Log filter (e.g. "info", "tabhead_core=debug"); RUST_LOG is used when unset
    #[clap(long, env = "TABHEAD_LOG_LEVEL", global = true)]
    log_level: Option<String>,
}

impl Global {
    /// The pipeline configuration: defaults, or the `--config` file over them.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::from_path(path)
                .wrap_err_with(|| f!("Failed to load config from {}", path.display())),
            None => Ok(PipelineConfig::default()),
        }
    }
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Extract headers from every PDF in a folder and write a CSV report
    Extract(crate::extract::ExtractOptions),

    /// Run one document and print the full result
    Inspect(crate::inspect::InspectOptions),
}

fn init_logging(global: &Global) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(filter) = &global.log_level {
        builder.parse_filters(filter);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logging(&app.global);

    match app.command {
        SubCommands::Extract(options) => crate::extract::run(options, app.global).await,
        SubCommands::Inspect(options) => crate::inspect::run(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
