use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[allow(clippy::struct_excessive_bools)]
#[derive(Parser, Debug)]
#[command(author, version, about = "Toast notification daemon driven from stdin", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Container to open and send toasts to.
    #[arg(long, value_name = "NAME")]
    pub container: Option<String>,

    /// Treat the viewport as constrained (always collapsed).
    #[arg(long, action = ArgAction::SetTrue)]
    pub constrained: bool,

    /// Mirror directional transitions for right-to-left layouts.
    #[arg(long, action = ArgAction::SetTrue)]
    pub rtl: bool,

    /// File used to persist collapse preferences.
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Emit JSON logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue)]
    pub json_logs: bool,

    /// Explicit log filter (e.g. "toast_engine=debug").
    #[arg(long, value_name = "FILTER")]
    pub log_filter: Option<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
