use std::path::Path;

use tracing::{debug, error};

use crate::domain::{SampleName, SpeciesRecord};
use crate::error::ProfileError;
use crate::profile;
use crate::store::ObjectStore;

/// Settings shared by every fetch-and-parse task of one run.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub bucket: &'a str,
    pub suffix: &'a str,
    pub scratch_root: Option<&'a Path>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Parsed {
        key: String,
        sample: SampleName,
        records: Vec<SpeciesRecord>,
    },
    Failed {
        key: String,
        reason: String,
    },
}

impl FetchOutcome {
    pub fn key(&self) -> &str {
        match self {
            FetchOutcome::Parsed { key, .. } | FetchOutcome::Failed { key, .. } => key,
        }
    }
}

/// Downloads `key` into a scratch directory and extracts its species rows.
///
/// A failed download is logged and reported as [`FetchOutcome::Failed`]; a
/// malformed table is an error. The scratch directory is removed when this
/// returns, whichever way it returns.
pub fn fetch_profile<S: ObjectStore + ?Sized>(
    store: &S,
    request: &FetchRequest<'_>,
    key: &str,
) -> Result<FetchOutcome, ProfileError> {
    let sample = SampleName::from_key(key, request.suffix);

    let mut builder = tempfile::Builder::new();
    builder.prefix("profile-reads-");
    let scratch = match request.scratch_root {
        Some(root) => builder.tempdir_in(root),
        None => builder.tempdir(),
    }
    .map_err(|err| ProfileError::Filesystem(format!("create scratch dir: {err}")))?;

    let file_name = key.rsplit('/').next().filter(|name| !name.is_empty()).unwrap_or("object");
    let destination = scratch.path().join(file_name);

    if let Err(err) = store.download(request.bucket, key, &destination) {
        error!(
            "Failed to retrieve object with bucket_name:{}; key_prefix:{}; destination:{}: {err}",
            request.bucket,
            key,
            destination.display()
        );
        return Ok(FetchOutcome::Failed {
            key: key.to_string(),
            reason: err.to_string(),
        });
    }

    let records = profile::extract_species(&destination, &sample)?;
    debug!(
        "Processed file {key} for {sample}. Found contributions from {} species",
        records.len()
    );
    Ok(FetchOutcome::Parsed {
        key: key.to_string(),
        sample,
        records,
    })
}
