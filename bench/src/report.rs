//! Report module: benchmark result types and their text/JSON renderings.

use crate::query::{BenchQuery, QueryShape};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use users_core::{BackendKind, DbError};

/// Timing of one query shape against one table size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkRun {
    pub table_size: u64,
    pub label: String,
    pub shape: QueryShape,
    pub elapsed_seconds: f64,
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunEntry {
    Completed(BenchmarkRun),
    Failed {
        table_size: u64,
        label: String,
        shape: QueryShape,
        error: String,
    },
}

impl RunEntry {
    pub fn completed(table_size: u64, query: &BenchQuery, elapsed: Duration, rows: usize) -> Self {
        RunEntry::Completed(BenchmarkRun {
            table_size,
            label: query.label.clone(),
            shape: query.shape,
            elapsed_seconds: elapsed.as_secs_f64(),
            row_count: rows,
        })
    }

    pub fn failed(table_size: u64, query: &BenchQuery, error: &DbError) -> Self {
        RunEntry::Failed {
            table_size,
            label: query.label.clone(),
            shape: query.shape,
            error: error.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RunEntry::Completed(run) => &run.label,
            RunEntry::Failed { label, .. } => label,
        }
    }

    pub fn table_size(&self) -> u64 {
        match self {
            RunEntry::Completed(run) => run.table_size,
            RunEntry::Failed { table_size, .. } => *table_size,
        }
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        match self {
            RunEntry::Completed(run) => Some(run.elapsed_seconds),
            RunEntry::Failed { .. } => None,
        }
    }
}

/// All entries recorded for one table size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeGroup {
    pub table_size: u64,
    /// `None` when population failed.
    pub populate_seconds: Option<f64>,
    pub entries: Vec<RunEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkReport {
    pub backend: BackendKind,
    pub groups: Vec<SizeGroup>,
}

impl BenchmarkReport {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            groups: Vec::new(),
        }
    }

    /// Entries in run order: sizes first, then queries.
    pub fn entries(&self) -> impl Iterator<Item = &RunEntry> {
        self.groups.iter().flat_map(|group| group.entries.iter())
    }

    pub fn failures(&self) -> usize {
        self.entries()
            .filter(|entry| matches!(entry, RunEntry::Failed { .. }))
            .count()
    }
}

pub fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.4}")
}

/// Write one size group: header, one `<label>\t<seconds> s` line per query,
/// then a blank line.
pub fn write_size_group(out: &mut dyn Write, group: &SizeGroup) -> io::Result<()> {
    writeln!(out, "Results for {} rows:", group.table_size)?;
    writeln!(out, "Query\tElapsed (s)")?;
    writeln!(out, "{}", "-".repeat(39))?;
    for entry in &group.entries {
        match entry {
            RunEntry::Completed(run) => {
                writeln!(out, "{}\t{} s", run.label, format_seconds(run.elapsed_seconds))?
            }
            RunEntry::Failed { label, error, .. } => writeln!(out, "{label}\tFAILED: {error}")?,
        }
    }
    writeln!(out)?;
    out.flush()
}

/// Print a comparison table: one row per label, one column per table size.
pub fn write_summary(out: &mut dyn Write, report: &BenchmarkReport) -> io::Result<()> {
    if report.groups.is_empty() {
        return Ok(());
    }

    writeln!(out, "Summary ({} backend, seconds):", report.backend)?;
    write!(out, "  {:12}", "Query")?;
    for group in &report.groups {
        write!(out, " {:>12}", group.table_size)?;
    }
    writeln!(out)?;
    writeln!(out, "  {}", "-".repeat(12 + 13 * report.groups.len()))?;

    // Labels in first-seen order.
    let mut labels: Vec<&str> = Vec::new();
    for entry in report.entries() {
        if !labels.contains(&entry.label()) {
            labels.push(entry.label());
        }
    }

    for label in labels {
        write!(out, "  {label:12}")?;
        for group in &report.groups {
            let cell = group
                .entries
                .iter()
                .find(|entry| entry.label() == label)
                .map(|entry| match entry.elapsed_seconds() {
                    Some(seconds) => format_seconds(seconds),
                    None => "FAILED".to_string(),
                })
                .unwrap_or_else(|| "-".to_string());
            write!(out, " {cell:>12}")?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    out.flush()
}

pub fn write_json(path: &Path, report: &BenchmarkReport) -> Result<(), DbError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report).map_err(io::Error::from)?;
    writer.flush()?;
    log::info!("Wrote JSON report to {}", path.display());
    Ok(())
}
