use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::error::ProfileError;

/// Opens a downloaded profile, gunzipping it when the name ends in `.gz`.
pub fn open_profile(path: &Path) -> Result<Box<dyn Read>, ProfileError> {
    let file = File::open(path)
        .map_err(|err| ProfileError::Filesystem(format!("open {}: {err}", path.display())))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Every regular file below `root`, depth first.
pub fn walk_files(root: &Path) -> Result<Vec<PathBuf>, ProfileError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(&path).map_err(|err| ProfileError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| ProfileError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.is_file() {
                items.push(path);
            }
        }
    }
    Ok(items)
}
