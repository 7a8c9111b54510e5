use crate::error::{Error, Result};
use crate::memory::STACK_CAPACITY;
use crate::timer::Timers;
use std::time::Duration;

pub const DEFAULT_INSTRUCTIONS_PER_SECOND: u32 = 600;
pub const DEFAULT_FRAME_HZ: u32 = 60;
pub const DEFAULT_STACK_DEPTH: usize = 16;

/// Tunables for one emulation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// CPU-step cadence.
    pub instructions_per_second: u32,
    /// Timer-tick cadence.
    pub timer_hz: u32,
    /// Display/input cadence used by the host.
    pub frame_hz: u32,
    /// Maximum number of nested calls; at most [`STACK_CAPACITY`].
    pub stack_depth: usize,
    /// Seed for `Cxnn`. Entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instructions_per_second: DEFAULT_INSTRUCTIONS_PER_SECOND,
            timer_hz: Timers::HZ,
            frame_hz: DEFAULT_FRAME_HZ,
            stack_depth: DEFAULT_STACK_DEPTH,
            seed: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.instructions_per_second == 0 || self.timer_hz == 0 || self.frame_hz == 0 {
            return Err(Error::Initialization("cadences must be at least 1 Hz".into()));
        }
        if !(1..=STACK_CAPACITY).contains(&self.stack_depth) {
            return Err(Error::Initialization(format!(
                "stack depth {} is outside 1..={STACK_CAPACITY}",
                self.stack_depth
            )));
        }
        Ok(())
    }

    pub fn cpu_period(&self) -> Duration {
        period(self.instructions_per_second)
    }

    pub fn timer_period(&self) -> Duration {
        period(self.timer_hz)
    }

    pub fn frame_period(&self) -> Duration {
        period(self.frame_hz)
    }
}

fn period(hz: u32) -> Duration {
    Duration::from_secs(1) / hz.max(1)
}
