use std::fs;
use std::path::Path;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::ProfileError;
use crate::fs_util;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
}

/// One response of a paginated listing. `next_continuation` is set while the
/// result set is truncated.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<ObjectSummary>,
    pub next_continuation: Option<String>,
}

pub trait ObjectStore: Send + Sync {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, ProfileError>;

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ProfileError>;
}

/// A directory tree used as a bucket. Keys are `/`-separated paths relative
/// to the bucket directory, and the whole listing fits on one page.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalObjectStore;

impl ObjectStore for LocalObjectStore {
    fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ObjectPage, ProfileError> {
        let root = Path::new(bucket);
        if !root.is_dir() {
            return Err(ProfileError::Listing {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
                message: "bucket directory does not exist".to_string(),
            });
        }

        let mut objects = Vec::new();
        for path in fs_util::walk_files(root)? {
            let relative = path
                .strip_prefix(root)
                .map_err(|err| ProfileError::Filesystem(err.to_string()))?;
            let relative = Utf8PathBuf::from_path_buf(relative.to_path_buf())
                .map_err(|_| ProfileError::Filesystem("non-utf8 file path in bucket".to_string()))?;
            let key = relative
                .components()
                .map(|component| component.as_str())
                .collect::<Vec<_>>()
                .join("/");
            if !key.starts_with(prefix) {
                continue;
            }
            let size = fs::metadata(&path)
                .map_err(|err| ProfileError::Filesystem(err.to_string()))?
                .len();
            objects.push(ObjectSummary { key, size });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));

        Ok(ObjectPage {
            objects,
            next_continuation: None,
        })
    }

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ProfileError> {
        let source = Path::new(bucket).join(key);
        fs::copy(&source, destination)
            .map(|_| ())
            .map_err(|err| ProfileError::Download {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: err.to_string(),
            })
    }
}
