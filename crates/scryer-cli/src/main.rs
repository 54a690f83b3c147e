use anyhow::Result;
use clap::Parser;
use scryer_core::{
    Core, CoreEvent, EventScheduler, WindowsProvider, create_or_load_config,
    create_or_load_patterns, start_routines,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scryer")]
#[command(about = "Remote process state mirror")]
struct Args {
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[arg(short, long, default_value = "patterns.json")]
    patterns: PathBuf,

    /// Status line interval in seconds while attached.
    #[arg(long, default_value_t = 5)]
    status_interval: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scryer=info".parse()?))
        .init();

    let args = Args::parse();

    info!("Scryer starting...");

    let config = create_or_load_config(&args.config)?;
    if config.targets.is_empty() {
        warn!(
            "No targets configured; edit {:?} and restart",
            args.config
        );
    }

    let patterns = create_or_load_patterns(&args.patterns)?;
    info!("Loaded {} patterns", patterns.patterns.len());

    let mut core = Core::new(WindowsProvider, config, patterns);
    let mut sched = EventScheduler::new();
    start_routines(&mut sched);

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    // ~60 Hz driver loop: every frame raises the per-frame event and ticks
    // the scheduler with real elapsed time.
    let frame = Duration::from_millis(16);
    let status_interval = Duration::from_secs(args.status_interval.max(1));
    let mut last_tick = Instant::now();
    let mut last_status = Instant::now();
    let mut was_attached = false;

    while running.load(Ordering::SeqCst) {
        thread::sleep(frame);
        let now = Instant::now();
        let elapsed = now - last_tick;
        last_tick = now;

        sched.signal(CoreEvent::FrameUpdate);
        sched.tick(&mut core, elapsed);

        let attached = core.process.is_attached();
        if attached != was_attached {
            was_attached = attached;
            last_status = now;
            if attached {
                info!(
                    "Mirroring pid {} ({} static addresses, {} routines)",
                    core.process.pid(),
                    core.statics.len(),
                    sched.len()
                );
            } else {
                info!("Target lost, waiting for it to come back");
            }
        }

        if attached && now - last_status >= status_interval {
            last_status = now;
            let area = core.process.window_area();
            info!(
                "pid {} window {}x{}{} active {} counter {} detail {}",
                core.process.pid(),
                area.width,
                area.height,
                if core.process.foreground() {
                    " (foreground)"
                } else {
                    ""
                },
                core.tree.state().active(),
                core.tree.change_counter().value(),
                core.tree.state().scene().detail().value(),
            );
        }
    }

    info!("Shutting down");
    Ok(())
}
