use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of one automation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub title: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Extra lines for the summary, e.g. recipients without a certificate
    pub notes: Vec<String>,
}

impl RunReport {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Default::default() }
    }

    pub fn success(&mut self) {
        self.total += 1;
        self.succeeded += 1;
    }

    pub fn failure(&mut self, error: impl Into<String>) {
        self.total += 1;
        self.failed += 1;
        self.errors.push(error.into());
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Percentage of items that succeeded; an empty run counts as 0
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total as f64 * 100.0
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn to_text(&self) -> String {
        let rule = "=".repeat(50);
        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total:       {}", self.total);
        let _ = writeln!(out, "Succeeded:   {}", self.succeeded);
        let _ = writeln!(out, "Failed:      {}", self.failed);
        let _ = writeln!(out, "Success rate: {:.1}%", self.success_rate());

        if !self.errors.is_empty() {
            let _ = writeln!(out, "\nErrors:");
            for error in &self.errors {
                let _ = writeln!(out, "  - {}", error);
            }
        }
        if !self.notes.is_empty() {
            let _ = writeln!(out, "\nNotes:");
            for note in &self.notes {
                let _ = writeln!(out, "  - {}", note);
            }
        }
        let _ = write!(out, "{}", rule);
        out
    }

    /// Error for the process exit status when anything failed
    pub fn into_result(self) -> anyhow::Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(anyhow::anyhow!("{}: {} of {} item(s) failed", self.title, self.failed, self.total))
        }
    }
}
