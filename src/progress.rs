//! Progress reporting for long per-row loops.
//!
//! The reporter is chosen once, before the loop starts. When a progress bar
//! is requested but stderr is not a terminal, periodic log lines are used
//! instead.

use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

pub trait ProgressReporter {
    fn start(&mut self, total: usize, label: &str);
    fn advance(&mut self);
    fn finish(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ProgressMode {
    #[default]
    Bar,
    Log,
    Silent,
}

/// Picks the reporter for `mode`, degrading a bar to log lines off-terminal.
pub fn select(mode: ProgressMode) -> Box<dyn ProgressReporter> {
    match mode {
        ProgressMode::Bar if std::io::stderr().is_terminal() => Box::new(BarProgress::default()),
        ProgressMode::Bar => {
            info!("stderr is not a terminal; reporting progress in the log");
            Box::new(LogProgress::default())
        }
        ProgressMode::Log => Box::new(LogProgress::default()),
        ProgressMode::Silent => Box::new(SilentProgress),
    }
}

#[derive(Default)]
pub struct BarProgress {
    bar: Option<ProgressBar>,
}

impl ProgressReporter for BarProgress {
    fn start(&mut self, total: usize, label: &str) {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(label.to_string());
        self.bar = Some(bar);
    }

    fn advance(&mut self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Logs a line every tenth of the work.
#[derive(Default)]
pub struct LogProgress {
    label: String,
    total: usize,
    done: usize,
    step: usize,
}

impl ProgressReporter for LogProgress {
    fn start(&mut self, total: usize, label: &str) {
        self.label = label.to_string();
        self.total = total;
        self.done = 0;
        self.step = (total / 10).max(1);
    }

    fn advance(&mut self) {
        self.done += 1;
        if self.done % self.step == 0 {
            info!("[{}] processed {}/{}", self.label, self.done, self.total);
        }
    }

    fn finish(&mut self) {
        if self.done % self.step != 0 {
            info!("[{}] processed {}/{}", self.label, self.done, self.total);
        }
    }
}

pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn start(&mut self, _total: usize, _label: &str) {}
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_progress_counts() {
        let mut progress = LogProgress::default();
        progress.start(25, "test");
        for _ in 0..25 {
            progress.advance();
        }
        progress.finish();
        assert_eq!(progress.done, 25);
        assert_eq!(progress.step, 2);
    }
}
