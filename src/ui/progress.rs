use crate::ui::progress_message::ProgressMessage;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::thread;
use std::time::Duration;

/// Renders importer progress messages on a spinner in a background thread
pub struct ImportProgress {
    bar: ProgressBar,
    handle: thread::JoinHandle<()>,
}

impl ImportProgress {
    pub fn new(source: &str) -> (Self, crossbeam::channel::Sender<ProgressMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded::<ProgressMessage>();

        let bar = if console::Term::stdout().is_term() {
            ProgressBar::new_spinner().with_message(format!("Reading {}", source))
        } else {
            ProgressBar::hidden()
        };

        let bar_clone = bar.clone();
        let handle = thread::spawn(move || {
            for msg in rx {
                match msg {
                    ProgressMessage::Started { columns } => {
                        bar_clone.enable_steady_tick(Duration::from_millis(100));
                        bar_clone.set_message(format!("Importing ({} columns)", columns));
                    }
                    ProgressMessage::Rows { rows, imported, failed } => {
                        bar_clone.set_position(rows as u64);
                        bar_clone.set_message(format!("{} imported, {} failed", imported, failed));
                    }
                    ProgressMessage::Finished { .. } => {
                        bar_clone.finish_and_clear();
                    }
                }
            }
        });

        (Self { bar, handle }, tx)
    }

    /// Wait for the renderer to drain. All senders must be dropped first.
    pub fn finish_with_summary(self, duration: Duration, imported: usize, failed: usize) {
        let _ = self.handle.join();
        self.bar.finish_and_clear();
        println!();
        println!(
            "{} {}",
            Icons::CHECK.style(theme().success.clone()),
            format!("Complete in {}", HumanDuration(duration)).style(theme().success.clone())
        );
        println!(
            "  {} {} imported  {} {} failed",
            Icons::UP.style(theme().accent.clone()),
            imported.style(theme().quantity.clone()),
            Icons::CROSS.style(theme().accent.clone()),
            failed.style(theme().quantity.clone())
        );
    }

    /// Tear down the spinner after a failed import
    pub fn abandon(self) {
        let _ = self.handle.join();
        self.bar.finish_and_clear();
    }
}

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_message(message.to_string());
        if console::Term::stdout().is_term() {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_with_message(&self, msg: &str) {
        self.pb.finish_with_message(msg.to_string());
    }
}
