//! JSON I/O handling for CLI
//!
//! - Input: one JSON object per stdin line (`watch`)
//! - Output: one JSON object per stdout line
//! - UTF-8 only

use std::io::{self, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Parse one request line
pub fn parse_request(line: &str) -> CliResult<Value> {
    if line.trim().is_empty() {
        return Err(CliError::invalid_input("Empty line"));
    }
    Ok(serde_json::from_str(line)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
