use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::domain::ObjectLocation;

/// Machine-readable record of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub location: String,
    pub suffix: String,
    pub objects_listed: usize,
    pub objects_matched: usize,
    pub total_bytes: u64,
    pub rows_written: usize,
    pub failed_keys: Vec<String>,
    pub output: String,
    pub started_at: String,
    pub finished_at: String,
    pub elapsed_ms: u128,
}

impl RunSummary {
    pub fn new(
        location: &ObjectLocation,
        suffix: &str,
        aggregation: &Aggregation,
        output: &str,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            location: location.to_string(),
            suffix: suffix.to_string(),
            objects_listed: aggregation.listing.objects_seen,
            objects_matched: aggregation.listing.keys.len(),
            total_bytes: aggregation.listing.total_bytes,
            rows_written: aggregation.table.len(),
            failed_keys: aggregation.failed_keys.clone(),
            output: output.to_string(),
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            elapsed_ms: aggregation.elapsed.as_millis(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
