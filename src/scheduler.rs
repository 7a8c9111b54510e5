//! Runs the machine in real time.
//!
//! Two worker threads share the machine with the host:
//!
//! * the CPU task executes one instruction per tick of
//!   [`Config::instructions_per_second`],
//! * the timer task decrements the timers once per tick of [`Config::timer_hz`].
//!
//! The host drives the third task, display and input, through a
//! [`DisplayBridge`]. Every task holds the machine lock for one unit of work
//! and never while sleeping. While the machine is halted in a key wait the CPU
//! task parks on a condition variable that [`DisplayBridge::press`] signals.

use crate::bridge::DisplayBridge;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::machine::Machine;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// State shared between the workers and the host.
#[derive(Debug)]
pub(crate) struct Shared {
    machine: Mutex<Machine>,
    key_pressed: Condvar,
    running: AtomicBool,
    failure: Mutex<Option<Error>>,
}

impl Shared {
    fn new(machine: Machine) -> Self {
        Self {
            machine: Mutex::new(machine),
            key_pressed: Condvar::new(),
            running: AtomicBool::new(true),
            failure: Mutex::new(None),
        }
    }

    /// Locks the machine. Nothing panics while holding the lock, so a
    /// poisoned guard still holds a consistent machine.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn notify_key(&self) {
        self.key_pressed.notify_all();
    }

    pub(crate) fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // Take the lock so a CPU task between its predicate check and its
        // wait cannot miss the wake-up.
        drop(self.lock());
        self.key_pressed.notify_all();
    }

    fn fail(&self, err: Error) {
        error!("Emulation stopped: {err}");
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        failure.get_or_insert(err);
        drop(failure);
        self.stop();
    }

    fn take_failure(&self) -> Option<Error> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Sleeps out the remainder of each fixed-length period.
struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    fn wait(&mut self) {
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
            self.next += self.period;
        } else {
            // Fell behind, e.g. after a key wait. Don't try to catch up.
            self.next = now + self.period;
        }
    }
}

/// Owns the machine and the worker threads running it.
#[derive(Debug)]
pub struct Scheduler {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Starts the CPU and timer tasks over `machine`.
    pub fn start(machine: Machine, config: &Config) -> Result<Self> {
        config.validate()?;
        let shared = Arc::new(Shared::new(machine));

        let cpu = {
            let shared = Arc::clone(&shared);
            let period = config.cpu_period();
            thread::Builder::new()
                .name("chipvm-cpu".into())
                .spawn(move || {
                    if let Err(err) = run_cpu(&shared, period) {
                        shared.fail(err);
                    }
                })
                .map_err(|e| Error::Initialization(format!("spawning CPU task: {e}")))?
        };

        let timer = {
            let shared = Arc::clone(&shared);
            let period = config.timer_period();
            thread::Builder::new()
                .name("chipvm-timer".into())
                .spawn(move || run_timers(&shared, period))
        };
        let timer = match timer {
            Ok(handle) => handle,
            Err(e) => {
                shared.stop();
                reap(cpu);
                return Err(Error::Initialization(format!("spawning timer task: {e}")));
            }
        };

        info!(
            "Scheduler started [ips: {}] [timer: {} Hz]",
            config.instructions_per_second, config.timer_hz
        );
        Ok(Self {
            shared,
            workers: vec![cpu, timer],
        })
    }

    /// A handle for the host's display/input loop.
    pub fn bridge(&self) -> DisplayBridge {
        DisplayBridge::new(Arc::clone(&self.shared))
    }

    /// False once shut down or once a worker hit an error.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Asks the workers to stop at their next iteration.
    pub fn shutdown(&self) {
        self.shared.stop();
    }

    /// Stops the workers, waits for them, and reports the error that ended
    /// emulation, if any.
    pub fn join(mut self) -> Result<()> {
        self.shared.stop();
        for worker in self.workers.drain(..) {
            reap(worker);
        }
        info!("Scheduler stopped");
        match self.shared.take_failure() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shared.stop();
        for worker in self.workers.drain(..) {
            reap(worker);
        }
    }
}

/// Joins a worker, logging instead of propagating a panic.
fn reap(worker: JoinHandle<()>) -> bool {
    let panicked = worker.join().is_err();
    if panicked {
        error!("A worker thread panicked");
    }
    panicked
}

fn run_cpu(shared: &Shared, period: Duration) -> Result<()> {
    let mut ticker = Ticker::new(period);
    while shared.is_running() {
        {
            let machine = shared.lock();
            // A halted machine isn't stepped again until a key is down.
            let mut machine = shared
                .key_pressed
                .wait_while(machine, |m| {
                    m.is_halted() && !m.any_key_pressed() && shared.is_running()
                })
                .unwrap_or_else(PoisonError::into_inner);
            if !shared.is_running() {
                break;
            }
            machine.step()?;
        }
        ticker.wait();
    }
    Ok(())
}

fn run_timers(shared: &Shared, period: Duration) {
    let mut ticker = Ticker::new(period);
    while shared.is_running() {
        shared.lock().tick_timers();
        ticker.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_resyncs_when_late() {
        let mut ticker = Ticker::new(Duration::from_millis(1));
        thread::sleep(Duration::from_millis(5));
        let before = Instant::now();
        ticker.wait();
        assert!(ticker.next > before);
    }

    #[test]
    fn stop_clears_running() {
        let shared = Shared::new(Machine::new());
        assert!(shared.is_running());
        shared.stop();
        assert!(!shared.is_running());
    }

    #[test]
    fn first_failure_is_kept() {
        let shared = Shared::new(Machine::new());
        shared.fail(Error::InvalidKey(20));
        shared.fail(Error::InvalidKey(21));
        assert!(matches!(shared.take_failure(), Some(Error::InvalidKey(20))));
        assert!(!shared.is_running());
    }
    #[test]
    fn panicked_worker_is_reaped() {
        let worker = thread::spawn(|| panic!("worker failed"));
        assert!(reap(worker));
        assert!(!reap(thread::spawn(|| ())));
    }
}
