use crate::error::Result;
use crate::framebuffer;
use crate::machine::Machine;
use crate::scheduler::Shared;
use log::debug;
use std::sync::Arc;

/// The host's view of a running machine: the display going out, key events
/// coming in.
///
/// Each call takes the machine lock for just that call.
#[derive(Debug, Clone)]
pub struct DisplayBridge {
    shared: Arc<Shared>,
}

impl DisplayBridge {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Whether the display changed since the last call. Reading clears the
    /// flag, so call this once per frame.
    pub fn query_and_clear_changed(&self) -> bool {
        self.shared.lock().display_changed()
    }

    /// A copy of the packed framebuffer.
    pub fn snapshot(&self) -> [u8; framebuffer::BYTES] {
        *self.shared.lock().framebuffer()
    }

    /// The change flag and, if set, the framebuffer, read under one lock.
    pub fn take_frame(&self) -> Option<[u8; framebuffer::BYTES]> {
        let mut machine = self.shared.lock();
        machine.display_changed().then(|| *machine.framebuffer())
    }

    /// Marks `key` as down and wakes a CPU task waiting for one.
    pub fn press(&self, key: u8) -> Result<()> {
        self.shared.lock().press(key)?;
        debug!("Pressed key {key:X}");
        self.shared.notify_key();
        Ok(())
    }

    pub fn release(&self, key: u8) -> Result<()> {
        self.shared.lock().release(key)?;
        debug!("Released key {key:X}");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Requests shutdown of the workers.
    pub fn stop(&self) {
        self.shared.stop();
    }

    /// Runs `f` against the machine under the lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&Machine) -> R) -> R {
        f(&self.shared.lock())
    }
}
