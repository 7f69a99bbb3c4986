use std::collections::HashSet;

use tracing::info;

use crate::error::ProfileError;
use crate::store::{ObjectStore, ObjectSummary};

/// Keys under a prefix that carry the wanted suffix.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub keys: Vec<String>,
    pub objects_seen: usize,
    pub total_bytes: u64,
}

/// Walks every page of the listing and keeps keys ending in `suffix`.
/// An empty suffix keeps everything. Listing errors are returned as-is.
pub fn list_matching_objects<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    prefix: &str,
    suffix: &str,
) -> Result<Listing, ProfileError> {
    let objects = list_all_objects(store, bucket, prefix)?;
    info!("Sifting through {} files ...", objects.len());

    let objects_seen = objects.len();
    let mut keys = Vec::new();
    let mut total_bytes = 0u64;
    for object in objects {
        if object.key.ends_with(suffix) {
            total_bytes += object.size;
            keys.push(object.key);
        }
    }

    info!(
        "Found {} files, totalling about {:.3} Gb.",
        keys.len(),
        total_bytes as f64 / 1e9
    );
    Ok(Listing {
        keys,
        objects_seen,
        total_bytes,
    })
}

pub fn list_all_objects<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ObjectSummary>, ProfileError> {
    let mut seen = HashSet::new();
    let mut objects = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let page = store.list_page(bucket, prefix, continuation.as_deref())?;
        for object in page.objects {
            if seen.insert(object.key.clone()) {
                objects.push(object);
            }
        }
        match page.next_continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }
    Ok(objects)
}
