//! Cycle outcome reporting.

use crate::common::ModId;

/// Outcome of checking a single mod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModOutcome {
    /// Latest release was already announced.
    Unchanged,
    /// The mod has no published files.
    NotFound,
    /// A new release was announced; holds a short description.
    Announced(String),
    /// Lookup, delivery or storage failed; retried next cycle.
    Failed,
}

/// Summary of one pass over all configured mods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub announced: Vec<String>,
    pub not_found: Vec<ModId>,
    pub failed: Vec<ModId>,
}

impl CycleReport {
    pub fn record(&mut self, mod_id: ModId, outcome: ModOutcome) {
        self.checked += 1;
        match outcome {
            ModOutcome::Unchanged => {}
            ModOutcome::NotFound => self.not_found.push(mod_id),
            ModOutcome::Announced(description) => self.announced.push(description),
            ModOutcome::Failed => self.failed.push(mod_id),
        }
    }

    /// One-line human readable summary.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Checked {} mod{}, found {} new",
            self.checked,
            if self.checked == 1 { "" } else { "s" },
            self.announced.len()
        );
        if !self.announced.is_empty() {
            summary.push_str(&format!(" ({})", self.announced.join(", ")));
        }
        if !self.failed.is_empty() {
            let failed: Vec<String> = self.failed.iter().map(|id| id.to_string()).collect();
            summary.push_str(&format!(", {} failed ({})", self.failed.len(), failed.join(", ")));
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let mut report = CycleReport::default();
        report.record(101, ModOutcome::Unchanged);
        report.record(202, ModOutcome::NotFound);

        assert_eq!(report.summary(), "Checked 2 mods, found 0 new");
        assert_eq!(report.not_found, vec![202]);
    }

    #[test]
    fn test_summary_with_announcements_and_failures() {
        let mut report = CycleReport::default();
        report.record(101, ModOutcome::Announced("Super Structures 1.2".to_string()));
        report.record(202, ModOutcome::Failed);
        report.record(303, ModOutcome::Failed);

        assert_eq!(
            report.summary(),
            "Checked 3 mods, found 1 new (Super Structures 1.2), 2 failed (202, 303)"
        );
    }

    #[test]
    fn test_singular_mod() {
        let mut report = CycleReport::default();
        report.record(101, ModOutcome::Unchanged);
        assert_eq!(report.summary(), "Checked 1 mod, found 0 new");
    }
}
