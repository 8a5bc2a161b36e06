use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Lightweight wrapper around `indicatif`'s spinner progress bar with
/// convenience helpers for printing output while the spinner is active.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    const TICK_RATE: Duration = Duration::from_millis(80);
    const TEMPLATE: &'static str = "{spinner:.green} {msg}";

    /// Start a spinner with the provided message.
    pub fn new(message: String) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template(Self::TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Self::TICK_RATE);
        Spinner { pb }
    }

    /// Print a line while keeping the spinner intact.
    pub fn println<T: AsRef<str>>(&self, message: T) {
        self.pb.println(message.as_ref());
    }

    /// Update the message shown next to the spinner.
    pub fn set_message(&self, message: String) {
        self.pb.set_message(message);
    }

    /// Stop the spinner and clear its line.
    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}
