//! Terminal rendering: progress bar, run summary and dry-run plan.

use crate::pipeline::{
    FragmentPlan, ProgressObserver, RunReport, SynthesisOutcome, SynthesisResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::fmt;
use std::sync::Mutex;

/// Characters of fragment text shown per plan line.
const PREVIEW_CHARS: usize = 60;

/// Progress bar on stderr driven by pipeline events.
pub struct TerminalProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let guard = self.bar.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(bar) = guard.as_ref() {
            f(bar);
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for TerminalProgress {
    fn started(&self, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            // SAFETY: hardcoded template string, always valid
            #[allow(clippy::expect_used)]
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} fragments ({eta}) {msg}",
                )
                .expect("hardcoded progress bar template")
                .progress_chars("#>-"),
        );
        *self.bar.lock().unwrap_or_else(|p| p.into_inner()) = Some(bar);
    }

    /// The only place a failed fragment is shown while the bar is drawn.
    fn fragment_finished(&self, completed: usize, _total: usize, result: &SynthesisResult) {
        self.with_bar(|bar| {
            if let SynthesisOutcome::Failed(reason) = &result.outcome {
                let line = format!("{} fragment {}: {reason}", "failed".red(), result.index);
                bar.println(line);
            }
            bar.set_position(completed as u64);
        });
    }

    fn concatenating(&self, artifacts: usize) {
        self.with_bar(|bar| {
            bar.finish_with_message(format!("joining {artifacts} file(s)"));
        });
    }
}

fn print_field(label: &str, value: impl fmt::Display) {
    println!("  {}{value}", format!("{label:<15}").dimmed());
}

/// Print the final summary of a successful run.
pub fn print_summary(report: &RunReport) {
    println!("{} {}", "Wrote".green(), report.output.display());
    print_field("Fragments:", report.total);
    print_field("Succeeded:", report.succeeded.green());
    if report.failed > 0 {
        print_field("Failed:", report.failed.yellow());
        for (index, reason) in &report.failures {
            println!("    #{index}: {}", reason.dimmed());
        }
    } else {
        print_field("Failed:", report.failed);
    }
    print_field("Cache hits:", report.cache_hits);
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= PREVIEW_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}…")
}

/// Print what a run would do.
pub fn print_plan(plan: &[FragmentPlan]) {
    if plan.is_empty() {
        println!("{}", "No speakable fragments".yellow());
        return;
    }
    for entry in plan {
        let status = if entry.cached {
            "cached".green().to_string()
        } else {
            "synthesize".yellow().to_string()
        };
        println!(
            "{:>4}  {}  {:<22} {:<10}  {}",
            entry.index,
            entry.language,
            entry.voice.dimmed(),
            status,
            preview(&entry.text)
        );
    }
    let cached = plan.iter().filter(|p| p.cached).count();
    println!(
        "{} fragment(s), {} cached, {} to synthesize",
        plan.len(),
        cached,
        plan.len() - cached
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::Language;
    use std::path::PathBuf;

    #[test]
    fn preview_flattens_and_shortens() {
        assert_eq!(preview("one\ntwo   three"), "one two three");
        let long = "word ".repeat(40);
        let shown = preview(&long);
        assert!(shown.ends_with('…'));
        assert_eq!(shown.chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn progress_without_start_is_noop() {
        let progress = TerminalProgress::new();
        progress.fragment_finished(1, 1, &SynthesisResult::failed(0, "boom"));
        progress.concatenating(0);
    }

    #[test]
    fn printing_does_not_panic() {
        print_plan(&[]);
        print_plan(&[FragmentPlan {
            index: 0,
            text: "Hello world.".to_string(),
            language: Language::English,
            voice: "en-US-AriaNeural".to_string(),
            cached: false,
        }]);
        print_summary(&RunReport {
            output: PathBuf::from("speech.mp3"),
            total: 2,
            succeeded: 1,
            failed: 1,
            cache_hits: 0,
            failures: vec![(1, "timed out".to_string())],
        });
    }
}
