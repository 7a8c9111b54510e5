use chipvm::memory::PROGRAM_ORIGIN;
use chipvm::{Config, DisplayBridge, Error, Machine, Scheduler};
use std::thread;
use std::time::{Duration, Instant};

fn config() -> Config {
    Config {
        instructions_per_second: 2000,
        timer_hz: 240,
        seed: Some(3),
        ..Default::default()
    }
}

fn start(program: &[u8]) -> Scheduler {
    let config = config();
    let mut machine = Machine::with_config(&config).unwrap();
    machine.load(program).unwrap();
    Scheduler::start(machine, &config).unwrap()
}

/// Polls `condition` until it holds or a generous deadline passes.
fn eventually(bridge: &DisplayBridge, condition: impl Fn(&Machine) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if bridge.inspect(&condition) {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn runs_until_shutdown() {
    // V0 += 1 forever.
    let scheduler = start(&[0x70, 0x01, 0x12, 0x00]);
    let bridge = scheduler.bridge();
    assert!(eventually(&bridge, |m| m.register(0) >= 5));
    assert!(scheduler.is_running());
    scheduler.join().unwrap();
    assert!(!bridge.is_running());
}

#[test]
fn key_wait_resumes_on_press() {
    // Wait for a key into V3, then spin.
    let scheduler = start(&[0xF3, 0x0A, 0x12, 0x02]);
    let bridge = scheduler.bridge();
    assert!(eventually(&bridge, Machine::is_halted));
    assert_eq!(bridge.inspect(Machine::pc), PROGRAM_ORIGIN);

    bridge.press(0x9).unwrap();
    assert!(eventually(&bridge, |m| !m.is_halted() && m.pc() == 0x202));
    assert_eq!(bridge.inspect(|m| m.register(3)), 0x9);
    scheduler.join().unwrap();
}

#[test]
fn shutdown_wakes_a_halted_cpu() {
    let scheduler = start(&[0xF0, 0x0A]);
    let bridge = scheduler.bridge();
    assert!(eventually(&bridge, Machine::is_halted));
    bridge.stop();
    // Joining would hang if the CPU task stayed parked.
    scheduler.join().unwrap();
}

#[test]
fn timers_run_while_halted() {
    // Delay := 0xFF, then wait for a key.
    let scheduler = start(&[0x60, 0xFF, 0xF0, 0x15, 0xF1, 0x0A]);
    let bridge = scheduler.bridge();
    assert!(eventually(&bridge, Machine::is_halted));
    assert!(eventually(&bridge, |m| m.timers().delay < 0xF0));
    scheduler.join().unwrap();
}

#[test]
fn display_changes_are_reported_once() {
    // Draw glyph 0 once, then spin.
    let scheduler = start(&[0xD0, 0x05, 0x12, 0x02]);
    let bridge = scheduler.bridge();
    assert!(eventually(&bridge, |m| m.pc() == 0x202));
    assert!(bridge.query_and_clear_changed());
    assert!(!bridge.query_and_clear_changed());
    assert_eq!(bridge.snapshot()[0], 0xF0);
    assert!(bridge.take_frame().is_none());
    scheduler.join().unwrap();
}

#[test]
fn engine_errors_stop_emulation() {
    let scheduler = start(&[0x60, 0x01, 0xFF, 0xFF]);
    let bridge = scheduler.bridge();
    let deadline = Instant::now() + Duration::from_secs(5);
    while bridge.is_running() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    assert!(!bridge.is_running());
    match scheduler.join() {
        Err(Error::UnknownInstruction { opcode, address }) => {
            assert_eq!(opcode, 0xFFFF);
            assert_eq!(address, 0x202);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    // The machine is left exactly where it failed.
    assert_eq!(bridge.inspect(Machine::pc), 0x202);
}

#[test]
fn rejects_invalid_keys() {
    let scheduler = start(&[0x12, 0x00]);
    let bridge = scheduler.bridge();
    assert!(matches!(bridge.press(0x10), Err(Error::InvalidKey(0x10))));
    assert!(bridge.release(0xF).is_ok());
    scheduler.join().unwrap();
}

#[test]
fn rejects_invalid_config() {
    let config = Config {
        instructions_per_second: 0,
        ..Default::default()
    };
    assert!(matches!(
        Scheduler::start(Machine::new(), &config),
        Err(Error::Initialization(_))
    ));
}
