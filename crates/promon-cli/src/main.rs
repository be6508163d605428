//! promon CLI - simulate a monitored batch job and print its progress

use anyhow::{bail, Context};
use clap::Parser;
use parking_lot::Mutex;
use promon_monitor::{
    MonitorConfig, MonitorError, Progress, ProgressListener, ProgressMonitor, TaskStatus,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "promon")]
#[command(about = "Hierarchical progress monitor - demonstration driver")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run a simulated batch job split into parallel sub-tasks
    Simulate(SimulateArgs),
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Work budget of the root task
    #[arg(short, long, default_value_t = 1000)]
    total: u64,

    /// Number of parallel sub-tasks (at least 2)
    #[arg(short, long, default_value_t = 4)]
    workers: u64,

    /// Steps performed by each sub-task
    #[arg(short, long, default_value_t = 20)]
    steps: u64,

    /// Milliseconds to sleep per step
    #[arg(long, default_value_t = 5)]
    delay_ms: u64,

    /// Request cancellation after this many steps in total
    #[arg(long)]
    cancel_after: Option<u64>,

    /// Allow the job to be canceled (implied by --cancel-after)
    #[arg(long)]
    cancelable: bool,

    /// Print the final snapshot as pretty JSON
    #[arg(long)]
    json: bool,
}

/// Logs root-level events as they happen.
#[derive(Default)]
struct LoggingListener {
    reported: Mutex<f64>,
}

impl ProgressListener for LoggingListener {
    fn on_worked(&self, work: f64) {
        let mut reported = self.reported.lock();
        *reported += work;
        debug!("{:.1} units reported so far", *reported);
    }

    fn on_task_started(&self, name: &str, total_work: u64) {
        info!("Started '{}' ({} units)", name, total_work);
    }

    fn on_task_finished(&self, name: &str) {
        info!("Finished '{}'", name);
    }

    fn on_task_failed(&self, name: &str, cause: &MonitorError) {
        warn!("'{}' failed: {}", name, cause);
    }

    fn on_cancel_requested(&self) {
        warn!("Cancellation requested");
    }

    fn on_task_canceled(&self, progress: &Progress) {
        warn!(
            "'{}' canceled at {:.0}%",
            progress.task_name,
            progress.work_percentage * 100.0
        );
    }
}

fn simulate(args: &SimulateArgs) -> anyhow::Result<Progress> {
    if args.workers < 2 || args.total / args.workers == 0 {
        bail!(
            "cannot split {} units across {} workers",
            args.total,
            args.workers
        );
    }
    if args.steps == 0 {
        bail!("each worker needs at least one step");
    }
    let share = args.total / args.workers;

    let cancelable = args.cancelable || args.cancel_after.is_some();
    let config = MonitorConfig::new().with_allow_cancellation(cancelable);
    let monitor = ProgressMonitor::with_config(config);
    monitor.add_listener(Arc::new(LoggingListener::default()));

    let steps_taken = AtomicU64::new(0);
    let delay = Duration::from_millis(args.delay_ms);

    let outcome = monitor.task("simulation", args.total, || {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..args.workers)
                .map(|worker| {
                    let monitor = &monitor;
                    let steps_taken = &steps_taken;
                    scope.spawn(move || {
                        monitor.sub_task(share, |sub| {
                            sub.task(&format!("worker-{worker}"), args.steps, || {
                                for _ in 0..args.steps {
                                    thread::sleep(delay);
                                    sub.worked(1)?;
                                    let taken = steps_taken.fetch_add(1, Ordering::SeqCst) + 1;
                                    if args.cancel_after == Some(taken) {
                                        sub.cancel()?;
                                    }
                                }
                                Ok(())
                            })
                        })
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                })
                .collect::<Result<Vec<()>, MonitorError>>()
        })?;
        // whatever the integer split left over
        monitor.worked(args.total - share * args.workers)
    });

    let progress = monitor.progress();
    match outcome {
        Ok(()) => Ok(progress),
        Err(err) if err.is_canceled() => {
            print_progress(&progress, args.json)?;
            bail!("simulation canceled after {} steps", steps_taken.into_inner())
        }
        Err(err) => {
            print_progress(&progress, args.json)?;
            Err(err).context("simulation failed")
        }
    }
}

fn print_progress(progress: &Progress, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(progress)?);
        return Ok(());
    }
    println!(
        "{}: {}/{} ({:.1}%) - {}",
        progress.task_name,
        progress.work_done,
        progress.total_work,
        progress.work_percentage * 100.0,
        progress.status
    );
    for child in &progress.completed_subtasks {
        println!("  {}: {}", child.task_name, child.status);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Some(Commands::Simulate(args)) => {
            let progress = simulate(&args)?;
            print_progress(&progress, args.json)?;
            if progress.status != TaskStatus::Completed {
                bail!("simulation ended as {}", progress.status);
            }
        }
        None => {
            println!("promon v{} - Use --help for commands", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
