//! Report rendering for the terminal
//!
//! Text output is meant for people: a summary line per repository, the
//! findings, then anything that went wrong. JSON output is the serialised
//! reports, one array for the whole run.

use crate::core::styles::StyleRole;
use crate::scanner::ScanReport;
use crate::tracker::{ObjectKind, ScanState};
use std::fmt::Write;

const SHORT_ID_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

pub fn render_reports(
    reports: &[ScanReport],
    format: OutputFormat,
    use_color: bool,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(reports),
        OutputFormat::Text => Ok(reports
            .iter()
            .map(|report| render_text(report, use_color))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

fn short(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

fn render_text(report: &ScanReport, use_color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {} {}",
        StyleRole::Header.paint("Repository", use_color),
        report.repository_path,
        StyleRole::Dim.paint(&format!("({})", report.repository_id), use_color)
    );

    if report.skipped {
        let _ = writeln!(
            out,
            "  {}",
            StyleRole::Dim.paint(&format!("already {}, not rescanned", report.state), use_color)
        );
        return out;
    }

    let count = |kind: ObjectKind, state: ScanState| {
        report.counts.get(&kind).map(|counts| counts.get(state)).unwrap_or(0)
    };
    let _ = writeln!(
        out,
        "  {} {} complete, {} failed",
        StyleRole::Key.paint("commits:", use_color),
        count(ObjectKind::Commit, ScanState::Complete),
        count(ObjectKind::Commit, ScanState::Error),
    );
    let _ = writeln!(
        out,
        "  {} {} complete, {} ignored, {} failed",
        StyleRole::Key.paint("files:  ", use_color),
        report.files_in_state(ScanState::Complete),
        report.files_in_state(ScanState::Ignore),
        report.files_in_state(ScanState::Error),
    );
    let _ = writeln!(
        out,
        "  {} {} units in {} batches, {:.1}s",
        StyleRole::Key.paint("units:  ", use_color),
        report.dispatch.units_submitted,
        report.dispatch.batches_flushed,
        report.duration.as_secs_f64(),
    );

    if report.findings.is_empty() {
        let _ = writeln!(out, "  {}", StyleRole::Clean.paint("no findings", use_color));
    } else {
        let _ = writeln!(
            out,
            "  {}",
            StyleRole::Finding.paint(&format!("{} findings", report.findings.len()), use_color)
        );
        for finding in &report.findings {
            let category = match &finding.result.subcategory {
                Some(sub) => format!("{}/{}", finding.result.category, sub),
                None => finding.result.category.clone(),
            };
            let _ = writeln!(
                out,
                "    {}:{} {} {} {}",
                finding.path,
                finding.object_offset,
                StyleRole::Accent.paint(short(&finding.commit_id), use_color),
                StyleRole::Finding.paint(&category, use_color),
                StyleRole::Dim.paint(&format!("{:.2}", finding.result.confidence), use_color),
            );
        }
    }

    if !report.errors.is_empty() {
        let _ = writeln!(
            out,
            "  {}",
            StyleRole::Error.paint(&format!("{} errors", report.errors.len()), use_color)
        );
        for error in &report.errors {
            let _ = writeln!(out, "    {}", error);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::types::{DetectionResult, ScanUnit, UnitMeta};
    use crate::store::ResultRecord;
    use crate::tracker::{FileOutcome, KeyData};
    use std::str::FromStr;

    fn report_with_finding() -> ScanReport {
        let meta = UnitMeta::new("0123456789abcdef", "c0ffee00c0ffee00", "blob1", "notes/patient.txt");
        let unit = ScanUnit::new(&meta, "seen by Jane Doe", 100).unwrap();
        let result = DetectionResult {
            category: "Person".to_string(),
            subcategory: None,
            text: "Jane Doe".to_string(),
            offset: 8,
            length: 8,
            confidence: 0.97,
            service: "test".to_string(),
        };

        let mut report = ScanReport::new("scan-0123456789abcdef", "0123456789abcdef", "/srv/portal");
        report.files.push(FileOutcome {
            data: KeyData::new("0123456789abcdef:blob1", ScanState::Complete, None),
            object_id: "blob1".to_string(),
            path: "notes/patient.txt".to_string(),
            commit_id: "c0ffee00c0ffee00".to_string(),
            unit_count: 1,
            finding_count: 1,
        });
        report.findings.push(ResultRecord::new(&unit, &result));
        report.errors.push("b.txt (blob2): Detection incomplete".to_string());
        report
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!(OutputFormat::from_str("json").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
        assert!(OutputFormat::from_str("xml").is_err());
    }

    #[test]
    fn test_text_lists_findings_and_errors() {
        let text = render_reports(&[report_with_finding()], OutputFormat::Text, false).unwrap();
        assert!(text.starts_with("Repository /srv/portal (0123456789abcdef)"));
        assert!(text.contains("files:   1 complete, 0 ignored, 0 failed"));
        assert!(text.contains("1 findings"));
        assert!(text.contains("notes/patient.txt:108 c0ffee00c0 Person 0.97"));
        assert!(text.contains("1 errors"));
        assert!(text.contains("b.txt (blob2): Detection incomplete"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_text_colours_only_when_enabled() {
        let text = render_reports(&[report_with_finding()], OutputFormat::Text, true).unwrap();
        assert!(text.contains("\x1b[31mPerson\x1b[0m"));
    }

    #[test]
    fn test_skipped_and_clean_reports() {
        let mut skipped = ScanReport::new("scan-1", "1", "/srv/done");
        skipped.skipped = true;
        skipped.state = ScanState::Complete;
        let clean = ScanReport::new("scan-2", "2", "/srv/clean");

        let text = render_reports(&[skipped, clean], OutputFormat::Text, false).unwrap();
        assert!(text.contains("already complete, not rescanned"));
        assert!(text.contains("no findings"));
    }

    #[test]
    fn test_json_is_an_array_of_reports() {
        let json = render_reports(&[report_with_finding()], OutputFormat::Json, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["repository_path"], "/srv/portal");
        assert_eq!(value[0]["findings"][0]["object_offset"], 108);
    }
}
