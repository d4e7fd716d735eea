// src/report/mod.rs
use crate::checker::ServiceVerdict;
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Summary<'a> {
    timestamp: i64,
    results: &'a [ServiceVerdict],
}

/// Render the human-facing table, one row per service.
pub fn render_table(results: &[ServiceVerdict]) -> String {
    let header = ["Service", "HTTP", "Status", "Detail"];
    let mut rows: Vec<[String; 4]> = Vec::with_capacity(results.len());

    for verdict in results {
        let http = &verdict.details.http;
        let status = http
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let detail = http
            .url
            .clone()
            .or_else(|| http.error.clone())
            .unwrap_or_else(|| "-".to_string());
        rows.push([
            verdict.service.clone(),
            if http.ok { "OK" } else { "FAIL" }.to_string(),
            status,
            detail,
        ]);
    }

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render_row = |cells: &[String; 4]| -> String {
        let line = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<w$}", cell, w = *width))
            .collect::<Vec<_>>()
            .join("  ");
        line.trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&render_row(&header.map(String::from)));
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1)));
    for row in &rows {
        out.push('\n');
        out.push_str(&render_row(row));
    }
    out
}

/// One machine-readable line: unix timestamp plus the full verdict list,
/// in check order.
pub fn summary_line(results: &[ServiceVerdict]) -> Result<String> {
    let summary = Summary {
        timestamp: Utc::now().timestamp(),
        results,
    };
    Ok(serde_json::to_string(&summary)?)
}

pub fn print_report(results: &[ServiceVerdict]) -> Result<()> {
    println!("{}", render_table(results));
    println!("{}", summary_line(results)?);
    Ok(())
}
