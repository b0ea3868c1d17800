use std::sync::OnceLock;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use regex::Regex;
use tracing::{info, trace};

use crate::util::command::OutputHandler;

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} tasks";
const TRANSFER_TEMPLATE: &str = "  {spinner} {msg}";

/// One parsed in-flight transfer line, e.g. `42% 1.5MB/s 0:00:07 ETA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    pub percent: u8,
    pub speed: String,
    pub eta: String,
}

impl TransferProgress {
    pub fn parse(line: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(\d{1,3})%\s+(\S+/s)\s+(\d+:\d{2}:\d{2})").expect("valid progress pattern")
        });
        let caps = pattern.captures(line)?;
        let percent = caps[1].parse::<u8>().ok().filter(|p| *p <= 100)?;
        Some(Self {
            percent,
            speed: caps[2].to_string(),
            eta: caps[3].to_string(),
        })
    }
}

/// Overall task counter plus the status line of the transfer in flight.
///
/// `completed` only moves at task boundaries via [`ProgressReporter::advance`];
/// transfer lines fed through [`OutputHandler`] only touch the auxiliary line.
pub struct ProgressReporter {
    completed: u64,
    visible: bool,
    multi: MultiProgress,
    bar: ProgressBar,
    transfer: ProgressBar,
}

impl ProgressReporter {
    pub fn new(total: u64, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        };
        let multi = MultiProgress::with_draw_target(target);
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let transfer = multi.add(ProgressBar::new_spinner());
        transfer.set_style(
            ProgressStyle::with_template(TRANSFER_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self {
            completed: 0,
            visible,
            multi,
            bar,
            transfer,
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    #[cfg(test)]
    fn total(&self) -> u64 {
        self.bar.length().unwrap_or(0)
    }

    #[cfg(test)]
    fn transfer_line(&self) -> String {
        self.transfer.message()
    }

    pub fn advance(&mut self) {
        self.completed += 1;
        self.transfer.set_message("");
        self.bar.set_position(self.completed);
    }

    pub fn message(&self, text: &str) {
        if self.visible {
            if self.multi.println(text).is_err() {
                info!("{}", text);
            }
        } else {
            info!("{}", text);
        }
    }

    pub fn finish(&self) {
        self.transfer.finish_and_clear();
        self.bar.finish();
    }
}

impl OutputHandler for ProgressReporter {
    fn on_chunk(&mut self, chunk: &str) {
        match TransferProgress::parse(chunk) {
            Some(progress) => {
                self.transfer.set_message(format!(
                    "{:>3}% {} ETA {}",
                    progress.percent, progress.speed, progress.eta
                ));
                self.transfer.tick();
            }
            None => trace!("{}", chunk.trim()),
        }
    }
}
