use crate::config::Config;
use clap::{Args as ClapArgs, Parser, Subcommand};

pub mod record;
pub mod screenshot;
pub mod status;

pub use record::handle_record_command;
pub use screenshot::handle_screenshot_command;
pub use status::handle_status_command;

#[derive(Parser, Debug)]
#[command(name = "meetrec")]
#[command(about = "Unattended Google Meet recorder", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Record a meeting through the running service
    Record(RecordCliArgs),
    /// Show the recorder status
    Status,
    /// Screenshot the live meeting page
    Screenshot,
    /// Print version information
    Version,
}

#[derive(ClapArgs, Debug)]
pub struct RecordCliArgs {
    /// Meeting link, e.g. https://meet.google.com/abc-defg-hij
    pub url: String,
    /// Capture window length in seconds (default: from config)
    #[arg(long)]
    pub duration_secs: Option<u64>,
    /// Return immediately instead of waiting for the session to finish
    #[arg(long)]
    pub no_wait: bool,
}

/// Base URL of the local service API, honoring a configured port.
pub fn service_base_url() -> String {
    let port = Config::load().map(|c| c.api.port).unwrap_or(3838);
    format!("http://127.0.0.1:{}", port)
}
