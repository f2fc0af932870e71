//! Artifact statistics.
//!
//! Summarizes what an index run produced: record count, artifact size, and
//! a per-module breakdown. Used by `aibook stats` as a quick check that the
//! module/chapter conventions of the content tree are being picked up.

use aibook_core::models::ContentRecord;
use anyhow::{Context, Result};
use std::path::Path;

/// Per-module record and content-size totals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStats {
    pub module: String,
    pub records: usize,
    pub chars: usize,
}

/// Group records by module, in order of first appearance.
pub fn module_breakdown(records: &[ContentRecord]) -> Vec<ModuleStats> {
    let mut out: Vec<ModuleStats> = Vec::new();
    for record in records {
        let chars = record.content.chars().count();
        match out.iter_mut().find(|s| s.module == record.module) {
            Some(stats) => {
                stats.records += 1;
                stats.chars += chars;
            }
            None => out.push(ModuleStats {
                module: record.module.clone(),
                records: 1,
                chars,
            }),
        }
    }
    out
}

/// Run the stats command: read the artifact and print a summary.
pub fn run_stats(artifact: &Path) -> Result<()> {
    let text = std::fs::read_to_string(artifact)
        .with_context(|| format!("Failed to read artifact {}", artifact.display()))?;
    let records: Vec<ContentRecord> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse artifact {}", artifact.display()))?;

    let modules = module_breakdown(&records);
    let total_chars: usize = modules.iter().map(|m| m.chars).sum();

    println!("aibook — Artifact Stats");
    println!("=======================");
    println!();
    println!("  Artifact:    {}", artifact.display());
    println!("  Size:        {}", format_bytes(text.len() as u64));
    println!("  Records:     {}", records.len());
    println!("  Characters:  {}", total_chars);

    if !modules.is_empty() {
        println!();
        println!("  By module:");
        println!("  {:<48} {:>8} {:>10}", "MODULE", "RECORDS", "CHARS");
        println!("  {}", "-".repeat(68));
        for m in &modules {
            println!("  {:<48} {:>8} {:>10}", m.module, m.records, m.chars);
        }
    }

    println!();
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
