//! Terminal rendering of the response pane.

use std::fmt::Write;

use colored::Colorize;
use probe_core::{DisplayOptions, ResponseState, ResponseView};
use serde_json::Value;

const INDENT: &str = "  ";

/// Status line above the tree, e.g. `200 · 12 ms · polled 3 times`.
pub fn status_line(view: &ResponseView, polled: Option<u64>) -> String {
    let mut parts = Vec::new();
    if let Some(status) = view.status {
        let status = status.to_string();
        parts.push(if status.starts_with('2') {
            status.green().bold().to_string()
        } else {
            status.red().bold().to_string()
        });
    }
    if let Some(elapsed) = view.elapsed {
        parts.push(format!("{} ms", elapsed.as_millis()));
    }
    if let Some(count) = polled {
        parts.push(format!("polled {count} {}", if count == 1 { "time" } else { "times" }));
    }
    parts.join(" · ")
}

/// Render the response as an indented JSON tree.
pub fn render(state: &ResponseState, options: DisplayOptions) -> String {
    let Some(value) = state.value() else {
        return "No data".dimmed().to_string();
    };
    let mut out = String::new();
    write_node(&mut out, "", value, 0, options);
    if options.enable_clipboard {
        let compact = serde_json::to_string(value).unwrap_or_default();
        let _ = writeln!(out, "{} {compact}", "copy:".dimmed());
    }
    out
}

/// Compact JSON, or an empty line for no data.
pub fn render_raw(state: &ResponseState) -> String {
    state
        .value()
        .map(|v| serde_json::to_string(v).unwrap_or_default())
        .unwrap_or_default()
}

/// `label` is the already formatted key or index, `""` at the root.
fn write_node(out: &mut String, label: &str, value: &Value, depth: usize, options: DisplayOptions) {
    let pad = INDENT.repeat(depth);

    match value {
        Value::Object(map) => {
            let _ = writeln!(out, "{pad}{label}{{{}", size_note(map.len(), options));
            for (k, v) in map {
                let label = format!("{}: ", json_string(k).cyan());
                write_node(out, &label, v, depth + 1, options);
            }
            let _ = writeln!(out, "{pad}}}");
        }
        Value::Array(items) => {
            let _ = writeln!(out, "{pad}{label}[{}", size_note(items.len(), options));
            for (i, v) in items.iter().enumerate() {
                let label = format!("{}: ", i.to_string().cyan());
                write_node(out, &label, v, depth + 1, options);
            }
            let _ = writeln!(out, "{pad}]");
        }
        scalar => {
            let type_note = if options.display_data_types && !scalar.is_null() {
                format!("{} ", type_name(scalar).dimmed())
            } else {
                String::new()
            };
            let _ = writeln!(out, "{pad}{label}{type_note}{}", scalar_text(scalar));
        }
    }
}

/// Quoted with JSON escapes, so keys and strings read as JSON text.
fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_default()
}

fn size_note(len: usize, options: DisplayOptions) -> String {
    if !options.display_object_size {
        return String::new();
    }
    let noun = if len == 1 { "item" } else { "items" };
    format!(" {}", format!("{len} {noun}").dimmed())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => json_string(s).green().to_string(),
        Value::Number(n) => n.to_string().yellow().to_string(),
        Value::Bool(b) => b.to_string().magenta().to_string(),
        other => other.to_string().dimmed().to_string(),
    }
}
