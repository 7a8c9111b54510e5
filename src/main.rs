use anyhow::Context;
use chipvm::display::Display;
use chipvm::{cli, input, Machine, Scheduler};
use log::{error, info};
use std::time::Instant;
use winit::event::{Event, VirtualKeyCode};
use winit::event_loop::{ControlFlow, EventLoop};
use winit_input_helper::WinitInputHelper;

fn main() -> anyhow::Result<()> {
    let cli = cli::init();
    let config = cli.config();

    let program = chipvm::read_program(&cli.path)?;
    let mut machine = Machine::with_config(&config)?;
    machine
        .load(&program)
        .with_context(|| format!("loading {}", cli.path.display()))?;

    let event_loop = EventLoop::new();
    let mut display = Display::new(&event_loop).context("opening display")?;
    let mut helper = WinitInputHelper::new();

    let scheduler = Scheduler::start(machine, &config)?;
    let bridge = scheduler.bridge();
    let mut scheduler = Some(scheduler);
    let frame_period = config.frame_period();

    event_loop.run(move |event, _, control_flow| {
        if let Event::RedrawRequested(_) = event {
            if let Err(e) = display.render() {
                error!("{e}");
                bridge.stop();
            }
        }

        if let Event::LoopDestroyed = event {
            let status = match scheduler.take().map(Scheduler::join) {
                Some(Err(e)) => {
                    error!("{e}");
                    1
                }
                _ => 0,
            };
            info!("Exiting [status: {status}]");
            std::process::exit(status);
        }

        if helper.update(&event) {
            if helper.key_pressed(VirtualKeyCode::Escape) || helper.quit() {
                bridge.stop();
            }

            if let Err(e) = input::forward(&helper, &bridge) {
                error!("{e}");
                bridge.stop();
            }

            if let Some(frame) = bridge.take_frame() {
                if let Err(e) = display.show(&frame) {
                    error!("{e}");
                    bridge.stop();
                }
            }

            if !bridge.is_running() {
                *control_flow = ControlFlow::Exit;
                return;
            }

            *control_flow = ControlFlow::WaitUntil(Instant::now() + frame_period);
        }
    });
}
