//! 命令行界面定义
//!
//! 定义了主程序的命令行参数和选项
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "leakscope")]
#[command(version)]
#[command(
    about = "IP leak diagnostics: an edge API service and a local WebRTC/DNS/timezone consistency check"
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run the edge API service
    Serve,

    /// Run a leak test from this host and print the report
    Check {
        /// Export the report as JSON (defaults to ip-leak-test-<date>.json)
        #[arg(long, value_name = "PATH")]
        export: Option<Option<PathBuf>>,

        /// Print the report as JSON instead of the terminal view
        #[arg(long)]
        json: bool,
    },

    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to config.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },
}
