use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::versions::{PLACEHOLDER, ReportSection, TrackedTool, VersionReport};

/// On-disk form of a version report configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub section: Option<SectionEntry>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default = "default_tools")]
    pub tools: Vec<ToolEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            section: None,
            placeholder: None,
            tools: default_tools(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SectionEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub section_name: Option<String>,
    #[serde(default)]
    pub section_href: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ToolEntry {
    Shorthand(String),
    Detailed(ToolEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ToolEntryObject {
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path` if given, otherwise returns the built-in report.
    pub fn resolve(path: Option<&Path>) -> Result<VersionReport, ProfileError> {
        let Some(path) = path else {
            return Self::resolve_config(Config::default());
        };
        let content = fs::read_to_string(path)
            .map_err(|_| ProfileError::ConfigRead(path.to_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ProfileError::ConfigParse(err.to_string()))?;
        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<VersionReport, ProfileError> {
        let defaults = ReportSection::default();
        let section = match config.section {
            Some(entry) => ReportSection {
                id: entry.id.unwrap_or(defaults.id),
                section_name: entry.section_name.unwrap_or(defaults.section_name),
                section_href: entry.section_href.unwrap_or(defaults.section_href),
                description: entry.description.unwrap_or(defaults.description),
            },
            None => defaults,
        };

        let tools = config
            .tools
            .into_iter()
            .map(|entry| match entry {
                ToolEntry::Shorthand(name) => {
                    let file = default_version_file(&name);
                    compile_tool(name, file, DEFAULT_PATTERN)
                }
                ToolEntry::Detailed(obj) => {
                    let file = obj.file.unwrap_or_else(|| default_version_file(&obj.name));
                    let pattern = obj.pattern.unwrap_or_else(|| DEFAULT_PATTERN.to_string());
                    compile_tool(obj.name, file, &pattern)
                }
            })
            .collect::<Result<Vec<_>, ProfileError>>()?;

        Ok(VersionReport {
            section,
            placeholder: config.placeholder.unwrap_or_else(|| PLACEHOLDER.to_string()),
            tools,
        })
    }
}

const DEFAULT_PATTERN: &str = r"(\S+)";

fn compile_tool(name: String, file: String, pattern: &str) -> Result<TrackedTool, ProfileError> {
    let pattern = Regex::new(pattern).map_err(|err| ProfileError::InvalidPattern {
        tool: name.clone(),
        message: err.to_string(),
    })?;
    if pattern.captures_len() < 2 {
        return Err(ProfileError::InvalidPattern {
            tool: name,
            message: "pattern needs a capture group for the version".to_string(),
        });
    }
    Ok(TrackedTool {
        name,
        file,
        pattern,
    })
}

pub fn default_version_file(name: &str) -> String {
    format!("v_{}.txt", name.to_lowercase())
}

/// Tools reported by the nf-profile-reads pipeline.
pub fn default_tools() -> Vec<ToolEntry> {
    let detailed = |name: &str, file: &str, pattern: &str| {
        ToolEntry::Detailed(ToolEntryObject {
            name: name.to_string(),
            file: Some(file.to_string()),
            pattern: Some(pattern.to_string()),
        })
    };
    vec![
        detailed("nf-profile-reads", "v_pipeline.txt", DEFAULT_PATTERN),
        ToolEntry::Shorthand("Nextflow".to_string()),
        ToolEntry::Shorthand("FastQC".to_string()),
        ToolEntry::Shorthand("BBmap".to_string()),
        detailed("MetaPhlAn", "v_metaphlan.txt", r"MetaPhlAn version (\S+)"),
        detailed("HUMAnN", "v_humann.txt", r"humann v(\S+)"),
        ToolEntry::Shorthand("qiime".to_string()),
        ToolEntry::Shorthand("MultiQC".to_string()),
    ]
}
