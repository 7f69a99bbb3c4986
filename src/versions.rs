//! Software version section for the pipeline's MultiQC report.
//!
//! Each tool container writes a small text file containing its version
//! banner. A [`VersionReport`] names those files and the pattern that pulls
//! the version token out of each one; [`render`] turns the scraped values
//! into the custom-content YAML block MultiQC picks up.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use regex::Regex;
use tracing::warn;

use crate::error::ProfileError;

/// Shown for tools whose version could not be found.
pub const PLACEHOLDER: &str = r#"<span style="color:#999999;">N/A</span>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub id: String,
    pub section_name: String,
    pub section_href: String,
    pub description: String,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            id: "software-versions".to_string(),
            section_name: "nf-profile-reads Software Versions".to_string(),
            section_href: "https://github.com/fischbachlab/nf-profile-reads".to_string(),
            description:
                "This information is collected at run time from the containers specification."
                    .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedTool {
    pub name: String,
    pub file: String,
    pub pattern: Regex,
}

#[derive(Debug, Clone)]
pub struct VersionReport {
    pub section: ReportSection,
    pub placeholder: String,
    pub tools: Vec<TrackedTool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersion {
    pub name: String,
    pub version: Option<String>,
}

/// `v` plus the first capture group of the first match.
pub fn extract_version(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|token| format!("v{}", token.as_str()))
}

/// Reads each tool's version file from `dir`. A missing file counts as an
/// unknown version; any other read error is returned.
pub fn scrape(report: &VersionReport, dir: &Path) -> Result<Vec<ToolVersion>, ProfileError> {
    report
        .tools
        .iter()
        .map(|tool| {
            let path = dir.join(&tool.file);
            let version = match fs::read_to_string(&path) {
                Ok(text) => extract_version(&tool.pattern, &text),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    warn!("version file {} not found for {}", path.display(), tool.name);
                    None
                }
                Err(err) => {
                    return Err(ProfileError::Filesystem(format!(
                        "read {}: {err}",
                        path.display()
                    )));
                }
            };
            Ok(ToolVersion {
                name: tool.name.clone(),
                version,
            })
        })
        .collect()
}

pub fn render(report: &VersionReport, versions: &[ToolVersion]) -> String {
    let section = &report.section;
    let mut out = String::new();
    let _ = writeln!(out, "id: '{}'", section.id);
    let _ = writeln!(out, "section_name: '{}'", section.section_name);
    let _ = writeln!(out, "section_href: '{}'", section.section_href);
    out.push_str("plot_type: 'html'\n");
    let _ = writeln!(out, "description: '{}'", section.description);
    out.push_str("data: |\n");
    out.push_str("    <dl class=\"dl-horizontal\">\n");
    for tool in versions {
        let value = tool.version.as_deref().unwrap_or(&report.placeholder);
        let _ = writeln!(out, "        <dt>{}</dt><dd>{}</dd>", tool.name, value);
    }
    out.push_str("    </dl>\n");
    out
}
