//! Built-in report builder for the daemon.
//!
//! Stands in for the real report source: produces a deterministic
//! per-organization summary in a fixed number of sections, pacing itself
//! with a configurable delay so the poll protocol is observable end to end.

use std::time::Duration;

use vantage_core::config::OracleSettings;
use vantage_core::report::Scope;
use vantage_services::{BuildProgress, ReportBuilder};

pub struct SectionReportBuilder {
    settings: OracleSettings,
}

impl SectionReportBuilder {
    pub fn new(settings: OracleSettings) -> Self {
        Self { settings }
    }
}

impl ReportBuilder for SectionReportBuilder {
    fn build(&self, scope: &Scope, progress: &BuildProgress) -> anyhow::Result<String> {
        let sections = self.settings.section_count.max(1);
        let mut lines = vec![format!("priority items summary for org {}", scope.org)];

        for i in 0..sections {
            if progress.is_cancelled() {
                anyhow::bail!("build cancelled");
            }
            // Deterministic per-org section content.
            let digest = blake3::hash(format!("{}/{}", scope.org, i).as_bytes());
            let weight = u32::from_le_bytes([
                digest.as_bytes()[0],
                digest.as_bytes()[1],
                digest.as_bytes()[2],
                digest.as_bytes()[3],
            ]) % 100;
            lines.push(format!("section {i}: {weight} items pending review"));

            progress.set_percent(((i + 1) * 100 / sections) as u8);
            std::thread::sleep(Duration::from_millis(self.settings.section_delay_ms));
        }

        Ok(lines.join("\n"))
    }
}
