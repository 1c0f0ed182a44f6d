//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::{Map, Value};
use std::io;

/// Result of a command, ready to be rendered
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// `KEY=value` lines, in order (os-release, env files)
    Vars(Vec<(String, String)>),
    /// Two-column table with a header
    Table {
        header: [&'static str; 2],
        rows: Vec<(String, String)>,
    },
    /// One item per line
    List(Vec<String>),
    /// Exit status of a command that imgkit ran
    Exit(i32),
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render command result
    pub fn render_result(&self, result: &CommandResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(&to_json(result)).map_err(io::Error::other)?;
            println!("{json}");
        } else {
            let text = render_plain(result);
            if !text.is_empty() {
                println!("{text}");
            }
        }
        Ok(())
    }
}

fn pairs_to_object(pairs: &[(String, String)]) -> Value {
    let map: Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}

/// JSON form of a result
pub fn to_json(result: &CommandResult) -> Value {
    match result {
        CommandResult::Vars(pairs) | CommandResult::Table { rows: pairs, .. } => {
            pairs_to_object(pairs)
        }
        CommandResult::List(items) => Value::from(items.clone()),
        CommandResult::Exit(code) => serde_json::json!({ "exit_code": code }),
    }
}

/// Plain-text form of a result
pub fn render_plain(result: &CommandResult) -> String {
    match result {
        CommandResult::Vars(pairs) => pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("\n"),
        CommandResult::Table { header, rows } => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header.to_vec());
            for (k, v) in rows {
                table.add_row(vec![k.as_str(), v.as_str()]);
            }
            table.to_string()
        }
        CommandResult::List(items) => items.join("\n"),
        CommandResult::Exit(_) => String::new(),
    }
}
