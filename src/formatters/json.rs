use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes file and folder reports in the camelCase wire schema. Output is
/// deterministic: the same report always serializes to the same bytes.
pub struct JsonFormatter {
    pretty: bool,
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn format<T: Serialize>(&self, report: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };
        Ok(json)
    }

    pub fn write<T: Serialize, W: Write>(&self, report: &T, mut writer: W) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut writer, report)?;
        } else {
            serde_json::to_writer(&mut writer, report)?;
        }
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn format_to_file<T: Serialize>(&self, report: &T, output_path: &Path) -> Result<()> {
        let file = File::create(output_path)
            .with_context(|| format!("failed to create {}", output_path.display()))?;
        self.write(report, BufWriter::new(file))
            .with_context(|| format!("failed to write {}", output_path.display()))
    }
}
