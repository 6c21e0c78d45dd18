use std::path::PathBuf;

use clap::Parser;
use nio_config::PROGRAM_NAME;

/// Command-line actions (§6). Flag spelling follows conventional long-form
/// clap style (`--start`) rather than the single-dash form of the system
/// this protocol was modeled on; the action set itself is unchanged.
#[derive(Parser, Debug)]
#[command(name = PROGRAM_NAME, version, about = "memcached-protocol cache server")]
pub struct Cli {
    /// Start the server in the foreground (or detached, with `nio.daemon`).
    #[arg(long, conflicts_with_all = ["stop", "status", "show_version"])]
    pub start: bool,

    /// Ask a running server to shut down.
    #[arg(long, conflicts_with_all = ["start", "status", "show_version"])]
    pub stop: bool,

    /// Ask a running server whether it is alive.
    #[arg(long, conflicts_with_all = ["start", "stop", "show_version"])]
    pub status: bool,

    /// Print the version string and exit.
    #[arg(long = "version", conflicts_with_all = ["start", "stop", "status"])]
    pub show_version: bool,

    /// Path to a `key = value` configuration file.
    #[arg(short = 'f', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Status,
    Version,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.stop {
            Action::Stop
        } else if self.status {
            Action::Status
        } else if self.show_version {
            Action::Version
        } else {
            Action::Start
        }
    }
}
