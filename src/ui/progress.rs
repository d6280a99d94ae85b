use indicatif::{HumanDuration, ProgressBar};
use std::time::{Duration, Instant};

/// Spinner on stderr for long-running steps. Hidden when stderr is not a
/// terminal, so scripted runs see no control sequences.
pub struct Spinner {
    pb: ProgressBar,
    started: Instant,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb, started: Instant::now() }
    }

    /// Remove the spinner and return how long it ran, human-readable
    pub fn finish(&self) -> String {
        self.pb.finish_and_clear();
        HumanDuration(self.started.elapsed()).to_string()
    }
}
