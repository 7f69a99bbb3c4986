//! Reshaping of MetaPhlAn `*_bugs_list.tsv` tables into long-format species
//! rows.
//!
//! Only the first three columns (`clade_name`, `ncbi_tax_id`,
//! `relative_abundance`) are read; `#` lines are comments. Rows above species
//! rank are dropped.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::domain::{AbundanceRecord, SampleName, SpeciesRecord};
use crate::error::ProfileError;
use crate::fs_util;

pub fn extract_species(
    path: &Path,
    sample: &SampleName,
) -> Result<Vec<SpeciesRecord>, ProfileError> {
    let reader = fs_util::open_profile(path)?;
    read_species(reader, path, sample)
}

/// Parses a profile from any reader. `source` only labels errors.
pub fn read_species<R: Read>(
    reader: R,
    source: &Path,
    sample: &SampleName,
) -> Result<Vec<SpeciesRecord>, ProfileError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .quoting(false)
        .flexible(true)
        .from_reader(reader);

    let mut species = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| {
            let line = err.position().map(|pos| pos.line()).unwrap_or(0);
            malformed(source, line, err.to_string())
        })?;
        let abundance = parse_record(&record, source)?;
        if let Some(row) = abundance.into_species(sample) {
            species.push(row);
        }
    }
    Ok(species)
}

fn parse_record(record: &StringRecord, source: &Path) -> Result<AbundanceRecord, ProfileError> {
    let line = record.position().map(|pos| pos.line()).unwrap_or(0);
    if record.len() < 3 {
        return Err(malformed(
            source,
            line,
            format!("expected at least 3 columns, found {}", record.len()),
        ));
    }

    let relative_abundance = record[2].trim().parse::<f64>().map_err(|_| {
        malformed(
            source,
            line,
            format!("relative abundance {:?} is not a number", &record[2]),
        )
    })?;
    let abundance = AbundanceRecord {
        clade_name: record[0].to_string(),
        ncbi_tax_id: record[1].trim().to_string(),
        relative_abundance,
    };

    if matches!(abundance.species_info(), Some((_, ref tax_id)) if tax_id.is_empty()) {
        return Err(malformed(
            source,
            line,
            format!("species {} has no taxonomy id", abundance.clade_name),
        ));
    }
    Ok(abundance)
}

fn malformed(source: &Path, line: u64, message: String) -> ProfileError {
    ProfileError::MalformedProfile {
        path: source.to_path_buf(),
        line,
        message,
    }
}
