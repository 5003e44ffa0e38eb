use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for blocking stages; hidden when stdout is not a terminal or
/// output is quiet
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let visible = console::Term::stdout().is_term() && !crate::output::is_quiet();
        let pb = if visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} {elapsed:.dim}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        if visible {
            pb.enable_steady_tick(Duration::from_millis(100));
        }
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}
