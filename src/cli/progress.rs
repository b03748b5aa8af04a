//! Terminal progress for long searches

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use bellwether::selector::{ReportSink, SearchEvent, TracingSink};

fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Spinner showing the current round; also forwards events to `tracing`.
pub struct ProgressSink {
    spinner: ProgressBar,
    repetitions: usize,
    quiet: bool,
}

impl ProgressSink {
    /// `quiet` hides the spinner and removal lines (JSON output).
    pub fn new(repetitions: usize, quiet: bool) -> Self {
        let spinner = if quiet {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(create_spinner_style());
            bar.enable_steady_tick(std::time::Duration::from_millis(100));
            bar
        };
        Self {
            spinner,
            repetitions,
            quiet,
        }
    }

    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ReportSink for ProgressSink {
    fn emit(&mut self, event: SearchEvent) {
        match &event {
            SearchEvent::RoundStarted {
                repetition,
                round,
                fraction,
                candidates,
            } => {
                self.spinner.set_message(format!(
                    "Repetition {}/{} · round {} · {} candidates · sampling {:.0}%",
                    repetition + 1,
                    self.repetitions,
                    round,
                    candidates,
                    fraction * 100.0
                ));
            }
            SearchEvent::Removed { round, removed, .. } if !self.quiet => {
                let names: Vec<String> = removed.iter().map(|r| r.dataset.clone()).collect();
                self.spinner.println(format!(
                    "  {} round {}: removed {}",
                    style("✗").red(),
                    round,
                    style(names.join(", ")).dim()
                ));
            }
            SearchEvent::Stalled { round, lives } if !self.quiet => {
                self.spinner.println(format!(
                    "  {} round {}: stalled, {} lives left",
                    style("·").yellow(),
                    round,
                    lives
                ));
            }
            _ => {}
        }
        TracingSink.emit(event);
    }
}
