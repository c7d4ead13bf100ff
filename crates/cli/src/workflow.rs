//! GitHub Actions workflow commands and step outputs.

use std::io::Write;
use std::path::Path;

/// Escape a message for use in a `::command::` line.
fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Format an annotation command such as `::error::message`.
pub fn command(kind: &str, message: &str) -> String {
    format!("::{}::{}", kind, escape_data(message))
}

/// Append `name=value` to the step output file named by `$GITHUB_OUTPUT`.
///
/// Does nothing outside a workflow.
pub fn set_output(name: &str, value: &str) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) if !path.is_empty() => append_output(Path::new(&path), name, value),
        _ => Ok(()),
    }
}

fn append_output(path: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}={}", name, value)
}
