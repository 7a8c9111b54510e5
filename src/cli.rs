use crate::config::{
    Config, DEFAULT_FRAME_HZ, DEFAULT_INSTRUCTIONS_PER_SECOND, DEFAULT_STACK_DEPTH,
};
use crate::timer::Timers;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the program image
    pub path: PathBuf,

    /// Verbosity of debug logging
    #[arg(short, long, value_enum)]
    debug: Option<DebugMode>,

    /// Instructions executed per second
    #[arg(long, default_value_t = DEFAULT_INSTRUCTIONS_PER_SECOND)]
    ips: u32,

    /// Timer decrements per second
    #[arg(long, default_value_t = Timers::HZ)]
    timer_hz: u32,

    /// Display refreshes per second
    #[arg(long, default_value_t = DEFAULT_FRAME_HZ)]
    frame_hz: u32,

    /// Maximum subroutine nesting
    #[arg(long, default_value_t = DEFAULT_STACK_DEPTH)]
    stack_depth: usize,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            instructions_per_second: self.ips,
            timer_hz: self.timer_hz,
            frame_hz: self.frame_hz,
            stack_depth: self.stack_depth,
            seed: self.seed,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum DebugMode {
    Info,
    Debug,
    Trace,
    Error,
}

impl DebugMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Error => "error",
        }
    }
}

/// Parses the command line and sets up logging.
pub fn init() -> Cli {
    let cli = Cli::parse();
    std::env::set_var(
        "RUST_LOG",
        format!("chipvm={}", cli.debug.unwrap_or(DebugMode::Error).as_str()),
    );

    env_logger::init();

    cli
}
