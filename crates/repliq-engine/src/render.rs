//! Report rendering: fixed-width table, per-relationship cards and CSV.
//!
//! Only the table truncates. Cards show full paths and ids, and CSV carries
//! every field verbatim so it can be read back into [`SummaryRow`]s.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::model::{ReplicationState, Role};
use crate::summary::{classify, ClusterSummary, SummaryReport, SummaryRow};

/// CSV header, in column order.
pub const CSV_COLUMNS: [&str; 12] = [
    "cluster_type",
    "cluster_name",
    "cluster_id",
    "source_path",
    "target_path",
    "remote_cluster",
    "state",
    "replication_id",
    "error",
    "recovery_point",
    "queued_snapshots",
    "replication_mode",
];

const PATH_WIDTH: usize = 35;
const STATE_WIDTH: usize = 15;
const CLUSTER_WIDTH: usize = 20;
const ID_WIDTH: usize = 16;
const TABLE_RULE: usize = 130;
const CARD_RULE: usize = 100;

/// Output format of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Fixed-width table.
    Table,
    /// One block per relationship.
    Card,
    /// Flat records.
    Csv,
}

/// A rendered report.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    /// Screen text.
    Text(String),
    /// Records for a CSV sink.
    Records(Vec<SummaryRow>),
}

/// Render a report in the requested format.
pub fn render(report: &SummaryReport, format: ReportFormat) -> Rendered {
    match format {
        ReportFormat::Table => Rendered::Text(render_table(report)),
        ReportFormat::Card => Rendered::Text(render_card(report)),
        ReportFormat::Csv => Rendered::Records(csv_records(report)),
    }
}

/// Shorten `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    if max <= 3 {
        return s.chars().take(max).collect();
    }
    let mut out: String = s.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn prefix(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn banner(lines: &mut Vec<String>, width: usize, summary: &ClusterSummary) {
    lines.push(String::new());
    lines.push("=".repeat(width));
    lines.push(format!("{} Cluster Summary:", summary.role));
    lines.push("=".repeat(width));
}

fn remote_label(role: Role) -> &'static str {
    match role {
        Role::Source => "Target",
        Role::Destination => "Source",
    }
}

fn local_label(role: Role) -> &'static str {
    match role {
        Role::Source => "Source",
        Role::Destination => "Target",
    }
}

fn error_notes(lines: &mut Vec<String>, report: &SummaryReport) {
    if report.errors.is_empty() {
        return;
    }
    lines.push(String::new());
    for err in &report.errors {
        lines.push(format!("ERROR: {}", err));
    }
}

/// Fixed-width table, one section per cluster.
pub fn render_table(report: &SummaryReport) -> String {
    let mut lines = Vec::new();
    for summary in &report.summaries {
        banner(&mut lines, TABLE_RULE, summary);
        lines.push(format!("Cluster Name: {}", summary.cluster_name));
        lines.push(format!("Total Relationships: {}", summary.rows.len()));
        for warning in &summary.warnings {
            lines.push(format!("Warning: {}", warning));
        }

        if summary.rows.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "No {} replication relationships found.",
                summary.role.label().to_lowercase()
            ));
            continue;
        }

        let remote = remote_label(summary.role);
        let header = format!(
            "{:<pw$} | {:<pw$} | {:<sw$} | {:<cw$} | {:<iw$}",
            format!("{} Path", local_label(summary.role)),
            format!("{} Path", remote),
            "State",
            format!("{} Cluster", remote),
            "ID (truncated)",
            pw = PATH_WIDTH,
            sw = STATE_WIDTH,
            cw = CLUSTER_WIDTH,
            iw = ID_WIDTH,
        );
        let rule = "-".repeat(header.chars().count());
        lines.push(String::new());
        lines.push(header);
        lines.push(rule);

        for row in &summary.rows {
            lines.push(format!(
                "{:<pw$} | {:<pw$} | {:<sw$} | {:<cw$} | {:<iw$}",
                truncate(row.local_path(), PATH_WIDTH),
                truncate(row.remote_path(), PATH_WIDTH),
                truncate(row.state.as_str(), STATE_WIDTH),
                truncate(&row.remote_cluster, CLUSTER_WIDTH),
                prefix(&row.replication_id, ID_WIDTH),
                pw = PATH_WIDTH,
                sw = STATE_WIDTH,
                cw = CLUSTER_WIDTH,
                iw = ID_WIDTH,
            ));
        }

        lines.push(String::new());
        lines.push(format!("{:<25} | {:<10}", "State", "Count"));
        lines.push("-".repeat(38));
        for (state, count) in &summary.histogram {
            lines.push(format!("{:<25} | {:<10}", state, count));
        }
    }
    error_notes(&mut lines, report);
    lines.join("\n")
}

/// Narrative cards with a health glyph per relationship.
pub fn render_card(report: &SummaryReport) -> String {
    let mut lines = Vec::new();
    for summary in &report.summaries {
        banner(&mut lines, CARD_RULE, summary);
        lines.push(format!(
            "Cluster: {} ({})",
            summary.cluster_name, summary.cluster_id
        ));
        lines.push(format!("Total Relationships: {}", summary.rows.len()));
        for warning in &summary.warnings {
            lines.push(format!("Warning: {}", warning));
        }

        if summary.rows.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "No {} replication relationships found.",
                summary.role.label().to_lowercase()
            ));
            continue;
        }
        lines.push(String::new());

        for row in &summary.rows {
            match row.cluster_type {
                Role::Source => lines.push(format!(
                    "▸ {} → {}:{}",
                    row.source_path, row.remote_cluster, row.target_path
                )),
                Role::Destination => lines.push(format!(
                    "▸ {}:{} → {}",
                    row.remote_cluster, row.source_path, row.target_path
                )),
            }
            lines.push(format!("  State: {} {}", row.state, row.health().glyph()));
            lines.push(format!("  ID: {}", row.replication_id));
            if let Some(error) = row.error.as_deref().filter(|e| !e.is_empty()) {
                lines.push(format!("  ⚠ Error: {}", error));
            }
            if let Some(ts) = &row.recovery_point {
                lines.push(format!("  Recovery Point: {}", ts.format("%Y-%m-%d %H:%M:%S")));
            }
            if row.cluster_type == Role::Source {
                if let Some(queued) = row.queued_snapshots.filter(|q| *q > 0) {
                    lines.push(format!("  Queued Snapshots: {}", queued));
                }
                if let Some(mode) = &row.replication_mode {
                    lines.push(format!("  Mode: {}", mode.label()));
                }
            }
            lines.push(String::new());
        }

        lines.push("State Summary:".to_string());
        for (state, count) in &summary.histogram {
            let glyph = classify(&ReplicationState::parse(state), None).glyph();
            lines.push(format!("  {} {}: {}", glyph, state, count));
        }
    }
    error_notes(&mut lines, report);
    lines.join("\n")
}

/// Flat records of every row, source rows first.
pub fn csv_records(report: &SummaryReport) -> Vec<SummaryRow> {
    report.rows().cloned().collect()
}

/// Write rows as CSV with a header line.
pub fn write_csv<W: Write>(rows: &[SummaryRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(CSV_COLUMNS)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write rows to a CSV file, replacing it.
pub fn write_csv_file(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let file = File::create(path)?;
    write_csv(rows, file)?;
    info!("Saved replication data to CSV: {}", path.display());
    Ok(())
}

/// Parse CSV written by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<SummaryRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows: Vec<SummaryRow> = Vec::new();
    for record in rdr.deserialize::<SummaryRow>() {
        rows.push(record?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_timestamp, ReplicationMode};
    use std::collections::BTreeMap;

    fn csv_string(rows: &[SummaryRow]) -> String {
        let mut buf = Vec::new();
        write_csv(rows, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn row(role: Role, id: &str, state: &str) -> SummaryRow {
        SummaryRow {
            cluster_type: role,
            cluster_name: "c1".into(),
            cluster_id: "0f9a3b2c-1111-2222-3333-444455556666".into(),
            source_path: "/data/a-very-long-directory-name-that-overflows/".into(),
            target_path: "/backup/data/a-very-long-directory-name-that-overflows/".into(),
            remote_cluster: "c2".into(),
            state: ReplicationState::parse(state),
            replication_id: id.into(),
            error: None,
            recovery_point: parse_timestamp("2025-10-21T06:40:30.804453983Z"),
            queued_snapshots: Some(3),
            replication_mode: Some(ReplicationMode::Continuous),
        }
    }

    fn report(rows: Vec<SummaryRow>) -> SummaryReport {
        let mut histogram = BTreeMap::new();
        for r in &rows {
            *histogram.entry(r.state.as_str().to_string()).or_insert(0) += 1;
        }
        SummaryReport {
            summaries: vec![ClusterSummary {
                role: Role::Source,
                cluster_name: "c1".into(),
                cluster_id: "id-1".into(),
                rows,
                histogram,
                warnings: vec![],
            }],
            errors: vec![],
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 35), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("abcdefghij", 8).chars().count(), 8);
        assert_eq!(truncate("é".repeat(40).as_str(), 35).chars().count(), 35);
    }

    #[test]
    fn test_table_truncates_paths_and_ids() {
        let id = "7a1c2e5f-aaaa-bbbb-cccc-ddddeeeeffff";
        let text = render_table(&report(vec![row(Role::Source, id, "ESTABLISHED")]));
        assert!(text.contains("Source Cluster Summary:"));
        assert!(text.contains(&"=".repeat(130)));
        assert!(text.contains("/data/a-very-long-directory-name..."));
        assert!(text.contains("7a1c2e5f-aaaa-bb"));
        assert!(!text.contains(id));
        assert!(text.contains(&format!("{:<25} | 1", "ESTABLISHED")));
    }

    #[test]
    fn test_card_shows_full_values() {
        let id = "7a1c2e5f-aaaa-bbbb-cccc-ddddeeeeffff";
        let text = render_card(&report(vec![row(Role::Source, id, "ESTABLISHED")]));
        assert!(text.contains(id));
        assert!(text.contains("/data/a-very-long-directory-name-that-overflows/"));
        assert!(text.contains("State: ESTABLISHED ✓"));
        assert!(text.contains("Recovery Point: 2025-10-21 06:40:30"));
        assert!(text.contains("Queued Snapshots: 3"));
        assert!(text.contains("Mode: Continuous"));
        assert!(text.contains("  ✓ ESTABLISHED: 1"));
    }

    #[test]
    fn test_error_notes_rendered() {
        let mut r = report(vec![]);
        r.errors.push("Destination cluster dst1: connection refused".into());
        let text = render_table(&r);
        assert!(text.contains("No source replication relationships found."));
        assert!(text.contains("ERROR: Destination cluster dst1: connection refused"));
        assert!(render_card(&r).contains("ERROR: Destination cluster"));
    }

    #[test]
    fn test_csv_header_and_round_trip() {
        let mut rows = vec![row(Role::Source, "r1", "ESTABLISHED")];
        let mut dst = row(Role::Destination, "r2", "ENDED");
        dst.queued_snapshots = None;
        dst.replication_mode = None;
        dst.recovery_point = None;
        dst.error = Some("target, \"quoted\" failure".into());
        rows.push(dst);

        let text = csv_string(&rows);
        assert_eq!(text.lines().next().unwrap(), CSV_COLUMNS.join(","));
        let back = read_csv(text.as_bytes()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_csv_empty_has_header() {
        let text = csv_string(&[]);
        assert_eq!(text.trim_end(), CSV_COLUMNS.join(","));
    }
}
