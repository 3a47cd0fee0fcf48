// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text table rendering for query output.

use std::time::{SystemTime, UNIX_EPOCH};

use flotilla_proto::api::{Node, NodeInstance, NodeInstanceDetail};

/// Render rows as aligned columns with a two-space gutter.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    let render_row = |out: &mut String, cells: &[String]| {
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(cell);
            if i + 1 < cells.len() {
                for _ in cell.len()..widths[i] {
                    out.push(' ');
                }
            }
        }
        out.push('\n');
    };

    render_row(&mut out, &headers.iter().map(|h| h.to_string()).collect::<Vec<_>>());
    for row in rows {
        render_row(&mut out, row);
    }
    out
}

/// "1.5G"-style rendering for byte counts.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [(&str, u64); 4] =
        [("T", 1 << 40), ("G", 1 << 30), ("M", 1 << 20), ("K", 1 << 10)];
    for (suffix, scale) in UNITS {
        if bytes >= scale {
            return format!("{:.1}{suffix}", bytes as f64 / scale as f64);
        }
    }
    format!("{bytes}B")
}

/// Relative age like "5s" or "2m"; "-" when never synced.
fn format_ago(epoch_ms: i64) -> String {
    if epoch_ms <= 0 {
        return "-".to_string();
    }
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64;
    let secs = (now_ms - epoch_ms).max(0) / 1000;
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

pub fn instances_table(instances: &[NodeInstance]) -> String {
    let rows: Vec<Vec<String>> = instances
        .iter()
        .map(|entry| {
            let instance = entry.instance.clone().unwrap_or_default();
            vec![
                entry.node_name.clone(),
                instance.name,
                instance.state,
                instance.ipv4.join(","),
                instance.image,
            ]
        })
        .collect();
    render_table(&["NODE", "NAME", "STATE", "IPV4", "IMAGE"], &rows)
}

pub fn nodes_table(nodes: &[Node]) -> String {
    let rows: Vec<Vec<String>> = nodes
        .iter()
        .map(|node| {
            let resource = node.resource.clone().unwrap_or_default();
            let cpu = resource.cpu.unwrap_or_default();
            let memory = resource.memory.unwrap_or_default();
            let disk = resource.disk.unwrap_or_default();
            vec![
                node.name.clone(),
                format_ago(node.last_sync_ms),
                node.addr.clone(),
                format!("{}/{}", cpu.available, cpu.total),
                format!("{}/{}", format_bytes(memory.available), format_bytes(memory.total)),
                format!("{}/{}", format_bytes(disk.available), format_bytes(disk.total)),
            ]
        })
        .collect();
    render_table(&["NODE", "LAST SYNC", "ADDRESS", "CPU", "MEMORY", "DISK"], &rows)
}

pub fn info_table(details: &[NodeInstanceDetail]) -> String {
    let rows: Vec<Vec<String>> = details
        .iter()
        .map(|entry| {
            let detail = entry.detail.clone().unwrap_or_default();
            vec![
                entry.node_name.clone(),
                detail.name,
                detail.cpu_count,
                detail.load,
                format!("{}/{}", detail.memory_usage, detail.memory_total),
                format!("{}/{}", detail.disk_usage, detail.disk_total),
                detail.current_release,
            ]
        })
        .collect();
    render_table(&["NODE", "NAME", "CPUS", "LOAD", "MEMORY", "DISK", "RELEASE"], &rows)
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
