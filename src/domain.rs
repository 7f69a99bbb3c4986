use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::ProfileError;

/// Clade prefix marking a species-level entry in a MetaPhlAn lineage.
pub const SPECIES_MARKER: &str = "s__";

/// Where the profiler outputs live: an S3 bucket/prefix or a local directory
/// that is treated as a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectLocation {
    S3 { bucket: String, prefix: String },
    Local { bucket: Utf8PathBuf, prefix: String },
}

impl ObjectLocation {
    pub fn bucket(&self) -> &str {
        match self {
            ObjectLocation::S3 { bucket, .. } => bucket,
            ObjectLocation::Local { bucket, .. } => bucket.as_str(),
        }
    }

    pub fn prefix(&self) -> &str {
        match self {
            ObjectLocation::S3 { prefix, .. } | ObjectLocation::Local { prefix, .. } => prefix,
        }
    }

    pub fn is_s3(&self) -> bool {
        matches!(self, ObjectLocation::S3 { .. })
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectLocation::S3 { bucket, prefix } => write!(f, "s3://{bucket}/{prefix}"),
            ObjectLocation::Local { bucket, prefix } => {
                write!(f, "{}", bucket.join(prefix))
            }
        }
    }
}

impl FromStr for ObjectLocation {
    type Err = ProfileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ProfileError::InvalidLocation(value.to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(ProfileError::InvalidLocation(value.to_string()));
            }
            return Ok(ObjectLocation::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }

        if trimmed.contains("://") && !trimmed.starts_with("file://") {
            return Err(ProfileError::InvalidLocation(value.to_string()));
        }
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        if path.is_empty() {
            return Err(ProfileError::InvalidLocation(value.to_string()));
        }

        // A trailing slash names the directory itself; otherwise the last
        // component is a key prefix inside its parent, as with S3.
        if path.ends_with('/') {
            return Ok(ObjectLocation::Local {
                bucket: Utf8PathBuf::from(path),
                prefix: String::new(),
            });
        }
        let path = Utf8Path::new(path);
        let prefix = path.file_name().unwrap_or_default().to_string();
        let bucket = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => Utf8PathBuf::from("."),
        };
        Ok(ObjectLocation::Local { bucket, prefix })
    }
}

/// Sample identifier derived from an object's file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SampleName(String);

impl SampleName {
    /// Base file name of `key` with `suffix` removed and trailing underscores
    /// stripped.
    pub fn from_key(key: &str, suffix: &str) -> Self {
        let base = key.rsplit('/').next().unwrap_or(key);
        let stem = base.strip_suffix(suffix).unwrap_or(base);
        Self(stem.trim_end_matches('_').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a profiler table, restricted to its first three columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AbundanceRecord {
    pub clade_name: String,
    pub ncbi_tax_id: String,
    pub relative_abundance: f64,
}

impl AbundanceRecord {
    /// Species name and taxonomy id, or `None` above species rank.
    pub fn species_info(&self) -> Option<(String, String)> {
        if !self.clade_name.contains(SPECIES_MARKER) {
            return None;
        }
        let leaf = self.clade_name.rsplit('|').next().unwrap_or_default();
        let species = leaf
            .replace(SPECIES_MARKER, "")
            .split('_')
            .collect::<Vec<_>>()
            .join(" ");
        let tax_id = self.ncbi_tax_id.rsplit('|').next().unwrap_or_default();
        Some((species, tax_id.to_string()))
    }

    pub fn into_species(self, sample: &SampleName) -> Option<SpeciesRecord> {
        let (species, species_tax_id) = self.species_info()?;
        Some(SpeciesRecord {
            species,
            species_tax_id,
            sample_name: sample.clone(),
            relative_abundance: self.relative_abundance,
        })
    }
}

/// Long-format output row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesRecord {
    pub species: String,
    pub species_tax_id: String,
    pub sample_name: SampleName,
    pub relative_abundance: f64,
}
