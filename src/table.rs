use std::io::Write;

use camino::Utf8Path;
use csv::WriterBuilder;

use crate::domain::SpeciesRecord;
use crate::error::ProfileError;

pub const COLUMNS: [&str; 4] = [
    "species",
    "species_tax_id",
    "sample_name",
    "relative_abundance",
];

/// Long-format table of every sample's species rows, in collection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    records: Vec<SpeciesRecord>,
}

impl AggregatedTable {
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Vec<SpeciesRecord>>,
    {
        let mut records = Vec::new();
        for table in tables {
            records.extend(table);
        }
        Self { records }
    }

    pub fn records(&self) -> &[SpeciesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Header row first, even when there are no records.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
        writer.write_record(COLUMNS)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes through a temp file in the destination directory, then renames
    /// it into place.
    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), ProfileError> {
        let output_error = |message: String| ProfileError::Output {
            path: path.as_std_path().to_path_buf(),
            message,
        };
        let parent = output_parent(path);
        let mut temp = tempfile::Builder::new()
            .prefix(".profile-reads-output")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| output_error(err.to_string()))?;
        self.write_to(temp.as_file_mut())
            .map_err(|err| output_error(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| output_error(err.to_string()))?;
        Ok(())
    }
}

/// Rejects output paths that cannot be written before any work starts.
pub fn validate_output_path(path: &Utf8Path) -> Result<(), ProfileError> {
    let invalid = || ProfileError::InvalidOutput(path.as_std_path().to_path_buf());
    if path.as_str().is_empty() || path.file_name().is_none() {
        return Err(invalid());
    }
    if path.as_std_path().is_dir() {
        return Err(invalid());
    }
    if !output_parent(path).as_std_path().is_dir() {
        return Err(invalid());
    }
    Ok(())
}

fn output_parent(path: &Utf8Path) -> &Utf8Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    }
}
