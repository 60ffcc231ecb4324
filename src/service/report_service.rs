use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xml,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xml => "xml",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "xml" => Ok(OutputFormat::Xml),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

pub struct ReportService;

impl ReportService {
    pub fn render(report: &Report, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|e| Error::Parse(format!("failed to encode report: {}", e))),
            OutputFormat::Xml => Ok(Self::render_xml(report)),
            OutputFormat::Csv => Ok(Self::render_csv(report)),
        }
    }

    pub fn write(report: &Report, format: OutputFormat, output_path: &Path) -> Result<()> {
        let rendered = Self::render(report, format)?;
        fs::write(output_path, rendered).map_err(|e| Error::Io {
            path: output_path.display().to_string(),
            source: e,
        })
    }

    fn render_xml(report: &Report) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!(
            "<report source=\"{}\" generated_at=\"{}\" block_minutes=\"{}\">\n",
            xml_escape(&report.source),
            report.generated_at.to_rfc3339(),
            report.block_minutes,
        ));
        for block in &report.blocks {
            out.push_str(&format!(
                "  <block start=\"{}\" end=\"{}\" busy_minutes=\"{}\" load=\"{}\">{}</block>\n",
                block.start.to_rfc3339(),
                block.end.to_rfc3339(),
                block.busy_minutes,
                block.load,
                block.state,
            ));
        }
        out.push_str("</report>\n");
        out
    }

    fn render_csv(report: &Report) -> String {
        let mut out = String::from("start,end,state,load\n");
        for block in &report.blocks {
            out.push_str(&format!(
                "{},{},{},{}\n",
                block.start.to_rfc3339(),
                block.end.to_rfc3339(),
                block.state,
                block.load,
            ));
        }
        out
    }
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
