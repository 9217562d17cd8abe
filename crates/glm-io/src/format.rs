//! Format detection for feeder files.
//!
//! Extension picks the candidate; a peek at the first few kilobytes decides
//! how sure we are.

use std::path::Path;

use anyhow::Result;

/// Supported feeder file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// GridLAB-D model text
    Glm,
    /// JSON feeder document (tree plus layout and attachments)
    Omd,
}

/// Confidence level for format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// Extension matches but content not verified
    Low,
    /// Extension and some content markers match
    Medium,
    /// Strong content markers confirm format
    High,
}

impl Format {
    pub const ALL: &'static [Format] = &[Format::Glm, Format::Omd];

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Glm => &["glm"],
            Format::Omd => &["omd", "json"],
        }
    }

    pub fn friendly_name(&self) -> &'static str {
        match self {
            Format::Glm => "GridLAB-D model",
            Format::Omd => "OMD feeder document",
        }
    }

    pub fn command_name(&self) -> &'static str {
        match self {
            Format::Glm => "glm",
            Format::Omd => "omd",
        }
    }

    /// Detect format from the file extension, confirmed by content when the
    /// file exists.
    pub fn detect(path: &Path) -> Option<(Format, Confidence)> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        let format = Self::ALL
            .iter()
            .find(|format| format.extensions().iter().any(|e| *e == ext))?;
        let confidence = format.sniff_content(path).unwrap_or(Confidence::Low);
        Some((*format, confidence))
    }

    fn sniff_content(&self, path: &Path) -> Result<Confidence> {
        let content: String = std::fs::read_to_string(path)?.chars().take(4096).collect();

        let confidence = match self {
            Format::Glm => {
                let markers = ["object ", "module ", "clock", "#set", "#include"];
                let hits = markers.iter().filter(|m| content.contains(*m)).count();
                match hits {
                    0 => Confidence::Low,
                    1 => Confidence::Medium,
                    _ => Confidence::High,
                }
            }
            Format::Omd => {
                let trimmed = content.trim_start();
                if trimmed.starts_with('{') && content.contains("\"tree\"") {
                    Confidence::High
                } else if trimmed.starts_with('{') {
                    Confidence::Medium
                } else {
                    Confidence::Low
                }
            }
        };
        Ok(confidence)
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.friendly_name())
    }
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "glm" | "gridlabd" => Ok(Format::Glm),
            "omd" | "json" => Ok(Format::Omd),
            _ => anyhow::bail!("Unknown format: {}. Supported: glm, omd", s),
        }
    }
}
