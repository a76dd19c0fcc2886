// [apps/histserv/src/cli.rs]
use clap::Parser;
use std::path::PathBuf;

/// Decoupled histogram telemetry receiver and JSROOT-facing HTTP front end.
#[derive(Debug, Clone, Parser)]
#[command(name = "histserv", about = "Histogram/canvas telemetry receiver and HTTP front end")]
pub struct Args {
    /// Address the telemetry (histogram sender) TCP ingest listens on.
    #[arg(long, env = "CBMRECO_LISTEN_ADDR", default_value = "0.0.0.0:5556")]
    pub listen_addr: String,

    /// Address the HTTP front end listens on.
    #[arg(long, env = "CBMRECO_HTTP_ADDR", default_value = "0.0.0.0:8080")]
    pub http_addr: String,

    /// Control endpoints to enable, comma-separated: reset_hist, save_hist, stop_server.
    /// Disabled by default; an unlisted path always answers 403.
    #[arg(long, env = "CBMRECO_ENABLE_CONTROL", value_delimiter = ',')]
    pub enable_control: Vec<String>,

    /// Directory the on-disk JSON histogram mirror is written under by `/Save_Hist`.
    #[arg(long, env = "CBMRECO_SAVE_DIR", default_value = "histo_dump")]
    pub save_dir: PathBuf,
}

impl Args {
    /// Whether the named control endpoint (`reset_hist`, `save_hist`, `stop_server`) is enabled.
    #[must_use]
    pub fn is_control_enabled(&self, name: &str) -> bool {
        self.enable_control.iter().any(|c| c.eq_ignore_ascii_case(name))
    }
}
