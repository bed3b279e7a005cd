// Output formatting for CLI

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::cli::config::OutputFormat;

/// Format and output data
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Serialize a report in the selected format
    pub fn output<T: Serialize>(&self, value: &T, writer: &mut impl Write) -> Result<()> {
        match self.format {
            OutputFormat::Pretty => writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?,
            OutputFormat::Json => writeln!(writer, "{}", serde_json::to_string(value)?)?,
        }
        Ok(())
    }

    /// Print success message
    pub fn print_success(&self, message: &str) {
        if !self.quiet {
            println!("✓ {}", message);
        }
    }

    /// Print error message
    pub fn print_error(&self, message: &str) {
        eprintln!("✗ {}", message);
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if !self.quiet {
            println!("  {}", message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: &'static str,
        len: u32,
    }

    const SAMPLE: Sample = Sample { name: "a", len: 1 };

    #[test]
    fn json_is_single_line() {
        let formatter = OutputFormatter::new(OutputFormat::Json, true);
        let mut out = Vec::new();
        formatter.output(&SAMPLE, &mut out).unwrap();
        let json = String::from_utf8(out).unwrap();
        assert_eq!(json, "{\"name\":\"a\",\"len\":1}\n");
    }

    #[test]
    fn pretty_is_indented() {
        let formatter = OutputFormatter::new(OutputFormat::Pretty, true);
        let mut out = Vec::new();
        formatter.output(&SAMPLE, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("\n  \"len\": 1"));
    }
}
