use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rayon::ThreadPoolBuilder;
use tracing::info;

use crate::domain::ObjectLocation;
use crate::error::ProfileError;
use crate::listing::{Listing, list_matching_objects};
use crate::store::ObjectStore;
use crate::table::AggregatedTable;
use crate::task::{FetchOutcome, FetchRequest, fetch_profile};

#[derive(Debug, Clone)]
pub struct AggregateRequest {
    pub location: ObjectLocation,
    pub suffix: String,
    pub workers: usize,
    pub scratch_root: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub table: AggregatedTable,
    pub listing: Listing,
    pub failed_keys: Vec<String>,
    pub elapsed: Duration,
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Lists the matching profiles, fetches and parses them on a worker pool,
/// and concatenates the results.
pub fn aggregate<S: ObjectStore + ?Sized>(
    store: &S,
    request: &AggregateRequest,
) -> Result<Aggregation, ProfileError> {
    let start = Instant::now();
    let bucket = request.location.bucket();
    let listing = list_matching_objects(store, bucket, request.location.prefix(), &request.suffix)?;
    if listing.keys.is_empty() {
        return Err(ProfileError::NoMatchingObjects {
            location: request.location.to_string(),
            suffix: request.suffix.clone(),
        });
    }

    let fetch = FetchRequest {
        bucket,
        suffix: &request.suffix,
        scratch_root: request.scratch_root.as_deref().map(|root| root.as_std_path()),
    };
    let outcomes = fan_out(store, &fetch, &listing.keys, request.workers)?;

    let mut failed_keys = Vec::new();
    let mut tables = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            FetchOutcome::Parsed { records, .. } => tables.push(records),
            FetchOutcome::Failed { key, .. } => failed_keys.push(key),
        }
    }
    let table = AggregatedTable::concat(tables);

    info!(
        "Aggregated {} species rows from {} of {} files",
        table.len(),
        listing.keys.len() - failed_keys.len(),
        listing.keys.len()
    );
    Ok(Aggregation {
        table,
        listing,
        failed_keys,
        elapsed: start.elapsed(),
    })
}

/// Runs one fetch task per key on `workers` threads and returns the outcomes
/// in completion order. Tasks start in key order. The first parse error stops
/// tasks that have not started yet and is returned once the pool has drained.
pub fn fan_out<S: ObjectStore + ?Sized>(
    store: &S,
    request: &FetchRequest<'_>,
    keys: &[String],
    workers: usize,
) -> Result<Vec<FetchOutcome>, ProfileError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|index| format!("profile-worker-{index}"))
        .build()
        .map_err(|err| ProfileError::WorkerPool(err.to_string()))?;

    let abort = AtomicBool::new(false);
    let (sender, receiver) = mpsc::channel();
    pool.scope_fifo(|scope| {
        let abort = &abort;
        for key in keys {
            let sender = sender.clone();
            scope.spawn_fifo(move |_| {
                if abort.load(Ordering::Relaxed) {
                    return;
                }
                let outcome = fetch_profile(store, request, key);
                if outcome.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                let _ = sender.send(outcome);
            });
        }
    });
    drop(sender);

    let mut outcomes = Vec::with_capacity(keys.len());
    for outcome in receiver {
        outcomes.push(outcome?);
    }
    Ok(outcomes)
}
