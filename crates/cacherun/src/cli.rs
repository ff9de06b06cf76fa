use crate::commands::Command;
use crate::logging::{LogLevel, TracingFormat};
use clap::Parser;
use std::ffi::OsString;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cacherun")]
#[command(about = "Run a command and cache its output for a period of time")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(
        short = 'c',
        long,
        env = "CACHERUN_CACHE_TIME",
        value_name = "SECONDS",
        default_value_t = 60,
        help = "Cached output expiration time in seconds"
    )]
    pub cache_time: u64,

    #[arg(
        short = 'l',
        long,
        help = "Display information about the commands currently cached"
    )]
    pub list_caches: bool,

    #[arg(
        short = 'r',
        long,
        value_name = "CACHE_ID",
        help = "Reset the cached output of the command identified by CACHE_ID, forcing it to run next time"
    )]
    pub reset_cache: Option<String>,

    #[arg(
        short = 'd',
        long,
        value_name = "CACHE_ID",
        num_args = 0..=1,
        help = "Delete all files of the command identified by CACHE_ID, or of every command when omitted"
    )]
    pub delete_cache: Option<Option<String>>,

    #[arg(long, help = "Set logging level", default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    #[arg(long, help = "Log output format", default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND",
        help = "Command to run, followed by its flags and arguments"
    )]
    pub command: Vec<OsString>,
}

impl From<Cli> for Command {
    fn from(cli: Cli) -> Self {
        if cli.list_caches {
            Command::ListCaches
        } else if let Some(identifier) = cli.delete_cache {
            Command::DeleteCache { identifier }
        } else if let Some(identifier) = cli.reset_cache {
            Command::ResetCache { identifier }
        } else if cli.command.is_empty() {
            Command::Help
        } else {
            Command::Run {
                cache_time: Duration::from_secs(cli.cache_time),
                argv: cli.command,
            }
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
