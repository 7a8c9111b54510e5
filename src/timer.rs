use log::trace;

/// The delay and sound timers. Both count down toward zero at the timer
/// cadence and stop there.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    /// Reference timer cadence in Hz.
    pub const HZ: u32 = 60;

    /// One decrement of each running timer.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
        trace!("Ticked timers [delay: {}] [sound: {}]", self.delay, self.sound);
    }

    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }
}
