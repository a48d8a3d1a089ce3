//! Fixed-width console listing of registered functions.

use std::fmt;

use crate::function::Function;

const COLUMNS: [(&str, usize); 4] = [
    ("path", 40),
    ("title", 20),
    ("params #", 10),
    ("description", 60),
];

/// Display adapter rendering one row per function.
pub struct Table<'a> {
    functions: &'a [Function],
}

impl<'a> Table<'a> {
    pub fn new(functions: &'a [Function]) -> Self {
        Self { functions }
    }
}

impl fmt::Display for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = COLUMNS.map(|(name, _)| name.to_string());
        write_row(f, &header)?;
        write_rule(f)?;
        for function in self.functions {
            let params = if function.has_param_types() {
                function.param_types().len().to_string()
            } else {
                String::new()
            };
            write_row(
                f,
                &[
                    function.path().unwrap_or_default().to_string(),
                    function.title().unwrap_or_default().to_string(),
                    params,
                    function.description().unwrap_or_default().to_string(),
                ],
            )?;
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, cells: &[String; 4]) -> fmt::Result {
    let mut line = String::new();
    for (cell, (_, width)) in cells.iter().zip(COLUMNS) {
        line.push_str("| ");
        line.push_str(&fit(cell, width));
        line.push(' ');
    }
    writeln!(f, "{line}|")
}

fn write_rule(f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut line = String::new();
    for (_, width) in COLUMNS {
        line.push('|');
        line.push_str(&"-".repeat(width + 2));
    }
    writeln!(f, "{line}|")
}

/// Pad or truncate to exactly `width` characters, marking truncation with `…`.
fn fit(cell: &str, width: usize) -> String {
    let count = cell.chars().count();
    if count <= width {
        format!("{cell:<width$}")
    } else {
        let mut out: String = cell.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn test_fit() {
        assert_eq!(fit("abc", 5), "abc  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("", 2), "  ");
    }

    #[test]
    fn test_table_rows() {
        let functions = vec![
            Function::sync("greet", |_ctx, _args| Ok(Value::Null))
                .with_path("/greet")
                .with_title("Greet")
                .with_param_types([json!({ "type": "string" })])
                .with_description("x".repeat(80)),
            Function::sync("bare", |_ctx, _args| Ok(Value::Null)),
        ];
        let rendered = Table::new(&functions).to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("| path "));
        assert!(lines[2].contains("/greet"));
        assert!(lines[2].contains("| 1          |"));
        assert!(lines[2].contains(&format!("{}…", "x".repeat(59))));
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }
}
