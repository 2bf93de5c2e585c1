//! Output formatters for CLI commands.
//!
//! Every command builds a serializable result and prints it through
//! [`format_output`], so all commands honor `--format` the same way.

use anyhow::Result;
use colored::Colorize;
use plugpack_core::cli::OutputFormat;
use serde::Serialize;

/// Formats `data` according to `format`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Examples
///
/// ```
/// use plugpack_cli::formatters::format_output;
/// use plugpack_core::cli::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Built {
///     module: String,
///     file_size: u64,
/// }
///
/// let built = Built {
///     module: "ExampleProvider".to_string(),
///     file_size: 2048,
/// };
///
/// let output = format_output(&built, OutputFormat::Json)?;
/// assert!(output.contains("\"module\""));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Formats data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    /// Formats data as single-line JSON.
    pub fn format_compact<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string(data)?)
    }
}

/// Plain text output formatting.
pub mod text {
    use super::{Result, Serialize, json};

    /// Formats data as one line per invocation, suitable for scripts.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        json::format_compact(data)
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize};
    use serde_json::Value;

    /// Formats data as colorized, indented output.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        write_value(&mut out, &value, 0);
        Ok(out)
    }

    fn write_value(out: &mut String, value: &Value, indent: usize) {
        let pad = "  ".repeat(indent);
        match value {
            Value::Null => out.push_str(&"-".dimmed().to_string()),
            Value::Bool(true) => out.push_str(&"yes".green().to_string()),
            Value::Bool(false) => out.push_str(&"no".yellow().to_string()),
            Value::Number(n) => out.push_str(&n.to_string().cyan().to_string()),
            Value::String(s) => out.push_str(s),
            Value::Array(items) if items.is_empty() => out.push_str(&"(none)".dimmed().to_string()),
            Value::Array(items) => {
                for item in items {
                    out.push('\n');
                    out.push_str(&pad);
                    out.push_str("- ");
                    write_value(out, item, indent + 1);
                }
            }
            Value::Object(fields) => {
                for (i, (key, field)) in fields.iter().enumerate() {
                    if i > 0 || indent > 0 {
                        out.push('\n');
                        out.push_str(&pad);
                    }
                    out.push_str(&key.blue().bold().to_string());
                    out.push_str(": ");
                    write_value(out, field, indent + 1);
                }
            }
        }
    }
}
