//! Progress output for user-facing status updates.
//!
//! `Progress` prints phase messages and, when operation logging is on, one
//! line per image. `ProgressReporter` prints the counters on a fixed interval
//! for as long as the run lasts.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::reconcile::{CounterSnapshot, ImageOutcome, ReconciliationCounters};

/// Progress reporter for user-facing output
pub struct Progress {
    writer: Box<dyn Write + Send>,
    /// When true, all output is suppressed
    silent: bool,
    /// When true, output is colorized
    colors_enabled: bool,
}

/// Check if we should use colors in output
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }
    io::stderr().is_terminal()
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress {
    /// Create a new progress reporter writing to stderr
    pub fn new() -> Self {
        Self {
            writer: Box::new(io::stderr()),
            silent: false,
            colors_enabled: should_use_colors(),
        }
    }

    /// Create a progress reporter with a custom writer
    pub fn with_writer(writer: Box<dyn Write + Send>, colors_enabled: bool) -> Self {
        Self {
            writer,
            silent: false,
            colors_enabled,
        }
    }

    pub fn silent() -> Self {
        Self {
            writer: Box::new(io::sink()),
            silent: true,
            colors_enabled: false,
        }
    }

    /// Report the root folder the traversal starts from
    pub fn root_resolved(&mut self, name: &str, id: &str) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{} {} {}",
                "Root folder".bold(),
                name.cyan(),
                format!("({})", id).dimmed()
            );
        } else {
            let _ = writeln!(self.writer, "Root folder {} ({})", name, id);
        }
    }

    /// Report what happened to a single image
    pub fn image_outcome(&mut self, index: u64, name: &str, outcome: &ImageOutcome) {
        if self.silent {
            return;
        }
        let counter = format!("[{}]", index);
        match outcome {
            ImageOutcome::NotFound => {
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {}",
                        counter.cyan(),
                        name.dimmed(),
                        "not found".yellow()
                    );
                } else {
                    let _ = writeln!(self.writer, "{} {} not found", counter, name);
                }
            }
            ImageOutcome::Renamed { new_name } => {
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {} {}",
                        counter.cyan(),
                        name.dimmed(),
                        "→".cyan(),
                        new_name
                    );
                } else {
                    let _ = writeln!(self.writer, "{} {} -> {}", counter, name, new_name);
                }
            }
            ImageOutcome::Planned { new_name } => {
                if self.colors_enabled {
                    let _ = writeln!(
                        self.writer,
                        "{} {} {} {} {}",
                        counter.cyan(),
                        name.dimmed(),
                        "→".cyan(),
                        new_name,
                        "(dry run)".dimmed()
                    );
                } else {
                    let _ = writeln!(
                        self.writer,
                        "{} {} -> {} (dry run)",
                        counter, name, new_name
                    );
                }
            }
        }
    }

    /// Report the live counters
    pub fn counters(&mut self, snapshot: &CounterSnapshot) {
        if self.silent {
            return;
        }
        let stamp = format!("[{}]", Local::now().format("%H:%M:%S"));
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{} {}", stamp.dimmed(), snapshot);
        } else {
            let _ = writeln!(self.writer, "{} {}", stamp, snapshot);
        }
        let _ = self.writer.flush();
    }

    /// Report an error during operation (non-fatal)
    pub fn warn(&mut self, message: &str) {
        if self.silent {
            return;
        }
        if self.colors_enabled {
            let _ = writeln!(self.writer, "{} {}", "!".yellow().bold(), message.yellow());
        } else {
            let _ = writeln!(self.writer, "Warning: {}", message);
        }
    }

    /// Report the end of the traversal
    pub fn run_complete(&mut self, snapshot: &CounterSnapshot, dry_run: bool) {
        if self.silent {
            return;
        }
        let _ = writeln!(self.writer);
        if dry_run {
            let message = format!(
                "Dry run complete. {} of {} images would be renamed.",
                snapshot.matched_images(),
                snapshot.total_images
            );
            if self.colors_enabled {
                let _ = writeln!(self.writer, "{}", message.dimmed());
            } else {
                let _ = writeln!(self.writer, "{}", message);
            }
        } else if self.colors_enabled {
            let _ = writeln!(
                self.writer,
                "{} {}",
                "✓".green().bold(),
                format!(
                    "{} of {} images renamed",
                    snapshot.renamed_images, snapshot.total_images
                )
                .green()
            );
        } else {
            let _ = writeln!(
                self.writer,
                "Run complete. {} of {} images renamed.",
                snapshot.renamed_images, snapshot.total_images
            );
        }
    }
}

/// Prints the counters every `interval` until stopped.
///
/// The first line appears after one full interval. The reporter only reads
/// the counters.
pub struct ProgressReporter {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn spawn(
        counters: Arc<ReconciliationCounters>,
        interval: Duration,
        mut progress: Progress,
        cancel: CancellationToken,
    ) -> Self {
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => progress.counters(&counters.snapshot()),
                }
            }
        });

        Self { handle, cancel }
    }

    /// Stop ticking and wait for the task to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}
