use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use profile_reads_utils::aggregate::{AggregateRequest, aggregate, fan_out};
use profile_reads_utils::domain::ObjectLocation;
use profile_reads_utils::error::ProfileError;
use profile_reads_utils::store::{LocalObjectStore, ObjectPage, ObjectStore, ObjectSummary};
use profile_reads_utils::table::AggregatedTable;
use profile_reads_utils::task::{FetchOutcome, FetchRequest, fetch_profile};

const SUFFIX: &str = "_metaphlan_bugs_list.tsv";

fn profile(species: &[(&str, &str, f64)]) -> String {
    let mut text = String::from("#clade_name\tNCBI_tax_id\trelative_abundance\n");
    text.push_str("k__Bacteria\t2\t100.0\n");
    for (name, tax_id, abundance) in species {
        text.push_str(&format!(
            "k__Bacteria|g__Genus|s__{name}\t2|1|{tax_id}\t{abundance}\n"
        ));
    }
    text
}

/// In-memory bucket; keys listed in `broken` fail to download.
#[derive(Default)]
struct MemoryStore {
    objects: HashMap<String, String>,
    broken: Vec<String>,
    downloads: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn with(mut self, key: &str, content: String) -> Self {
        self.objects.insert(key.to_string(), content);
        self
    }

    fn broken(mut self, key: &str) -> Self {
        self.objects.insert(key.to_string(), String::new());
        self.broken.push(key.to_string());
        self
    }
}

impl ObjectStore for MemoryStore {
    fn list_page(
        &self,
        _bucket: &str,
        prefix: &str,
        _continuation: Option<&str>,
    ) -> Result<ObjectPage, ProfileError> {
        let mut objects = self
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, content)| ObjectSummary {
                key: key.clone(),
                size: content.len() as u64,
            })
            .collect::<Vec<_>>();
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(ObjectPage {
            objects,
            next_continuation: None,
        })
    }

    fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<(), ProfileError> {
        self.downloads.lock().unwrap().push(key.to_string());
        if self.broken.iter().any(|broken| broken == key) {
            return Err(ProfileError::Download {
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
            });
        }
        let content = self.objects.get(key).ok_or_else(|| ProfileError::Download {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: "NoSuchKey".to_string(),
        })?;
        std::fs::write(destination, content)
            .map_err(|err| ProfileError::Filesystem(err.to_string()))
    }
}

fn request(prefix: &str, workers: usize) -> AggregateRequest {
    AggregateRequest {
        location: ObjectLocation::S3 {
            bucket: "results".to_string(),
            prefix: prefix.to_string(),
        },
        suffix: SUFFIX.to_string(),
        workers,
        scratch_root: None,
    }
}

#[test]
fn concatenates_every_sample() {
    let store = MemoryStore::default()
        .with(
            "run/S1_metaphlan_bugs_list.tsv",
            profile(&[
                ("Anaerostipes_hadrus", "649756", 10.0),
                ("Bacteroides_ovatus", "28116", 5.0),
            ]),
        )
        .with(
            "run/S2__metaphlan_bugs_list.tsv",
            profile(&[("Bacteroides_ovatus", "28116", 7.5)]),
        )
        .with("run/S3_metaphlan_bugs_list.tsv", profile(&[]))
        .with("run/S1.log", "log".to_string());

    let aggregation = aggregate(&store, &request("run/", 3)).unwrap();

    assert_eq!(aggregation.listing.keys.len(), 3);
    assert_eq!(aggregation.table.len(), 3);
    assert!(aggregation.failed_keys.is_empty());

    let mut samples = aggregation
        .table
        .records()
        .iter()
        .map(|row| row.sample_name.as_str().to_string())
        .collect::<Vec<_>>();
    samples.sort();
    assert_eq!(samples, vec!["S1", "S1", "S2"]);
}

#[test]
fn failed_download_drops_only_that_sample() {
    let store = MemoryStore::default()
        .with(
            "run/S1_metaphlan_bugs_list.tsv",
            profile(&[("Anaerostipes_hadrus", "649756", 10.0)]),
        )
        .broken("run/S2_metaphlan_bugs_list.tsv")
        .with(
            "run/S3_metaphlan_bugs_list.tsv",
            profile(&[("Bacteroides_ovatus", "28116", 2.0)]),
        );

    let aggregation = aggregate(&store, &request("run/", 2)).unwrap();

    assert_eq!(
        aggregation.failed_keys,
        vec!["run/S2_metaphlan_bugs_list.tsv".to_string()]
    );
    assert_eq!(aggregation.table.len(), 2);
    assert!(
        aggregation
            .table
            .records()
            .iter()
            .all(|row| row.sample_name.as_str() != "S2")
    );
}

#[test]
fn malformed_profile_aborts_run() {
    let store = MemoryStore::default()
        .with(
            "run/S1_metaphlan_bugs_list.tsv",
            "k__Bacteria|s__Broken_row\t2|7\tnot-a-number\n".to_string(),
        );

    let err = aggregate(&store, &request("run/", 1)).unwrap_err();
    assert_matches!(err, ProfileError::MalformedProfile { .. });
}

#[test]
fn malformed_profile_skips_tasks_not_yet_started() {
    let mut store = MemoryStore::default().with(
        "run/A_metaphlan_bugs_list.tsv",
        "k__Bacteria|s__Broken_row\t2|7\tnot-a-number\n".to_string(),
    );
    for index in 0..5 {
        store = store.with(
            &format!("run/S{index}_metaphlan_bugs_list.tsv"),
            profile(&[("Genus_species", "1", 1.0)]),
        );
    }

    let err = aggregate(&store, &request("run/", 1)).unwrap_err();
    assert_matches!(err, ProfileError::MalformedProfile { .. });

    let downloaded = store.downloads.lock().unwrap().clone();
    assert!(downloaded.len() < 6);
    assert_eq!(downloaded, vec!["run/A_metaphlan_bugs_list.tsv".to_string()]);
}

#[test]
fn no_matching_objects_is_an_error() {
    let store = MemoryStore::default().with("run/S1.log", "log".to_string());
    let err = aggregate(&store, &request("run/", 1)).unwrap_err();
    assert_matches!(err, ProfileError::NoMatchingObjects { .. });
}

#[test]
fn fan_out_runs_each_key_once() {
    let mut store = MemoryStore::default();
    let mut keys = Vec::new();
    for index in 0..16 {
        let key = format!("run/S{index}_metaphlan_bugs_list.tsv");
        store = store.with(&key, profile(&[("Genus_species", "1", 1.0)]));
        keys.push(key);
    }
    let fetch = FetchRequest {
        bucket: "results",
        suffix: SUFFIX,
        scratch_root: None,
    };

    let outcomes = fan_out(&store, &fetch, &keys, 4).unwrap();
    assert_eq!(outcomes.len(), 16);

    let mut downloaded = store.downloads.lock().unwrap().clone();
    downloaded.sort();
    let mut expected = keys.clone();
    expected.sort();
    assert_eq!(downloaded, expected);

    let table = AggregatedTable::concat(outcomes.into_iter().map(|outcome| match outcome {
        FetchOutcome::Parsed { records, .. } => records,
        FetchOutcome::Failed { .. } => Vec::new(),
    }));
    assert_eq!(table.len(), 16);
}

#[test]
fn scratch_dir_is_removed_after_each_task() {
    let scratch = tempfile::tempdir().unwrap();
    let store = MemoryStore::default()
        .with(
            "run/S1_metaphlan_bugs_list.tsv",
            profile(&[("Genus_species", "1", 1.0)]),
        )
        .broken("run/S2_metaphlan_bugs_list.tsv");
    let fetch = FetchRequest {
        bucket: "results",
        suffix: SUFFIX,
        scratch_root: Some(scratch.path()),
    };

    let parsed = fetch_profile(&store, &fetch, "run/S1_metaphlan_bugs_list.tsv").unwrap();
    assert_matches!(parsed, FetchOutcome::Parsed { ref records, .. } if records.len() == 1);
    let failed = fetch_profile(&store, &fetch, "run/S2_metaphlan_bugs_list.tsv").unwrap();
    assert_matches!(failed, FetchOutcome::Failed { .. });
    assert_eq!(failed.key(), "run/S2_metaphlan_bugs_list.tsv");

    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn local_directory_end_to_end() {
    let bucket = tempfile::tempdir().unwrap();
    let run = bucket.path().join("2021_10_12");
    std::fs::create_dir_all(run.join("BC000217_002")).unwrap();
    std::fs::write(
        run.join("BC000217_002/BC000217_002_metaphlan_bugs_list.tsv"),
        profile(&[("Anaerostipes_hadrus", "649756", 12.5)]),
    )
    .unwrap();
    std::fs::write(run.join("multiqc_report.html"), "<html/>").unwrap();

    let location: ObjectLocation = run.to_str().unwrap().parse().unwrap();
    let output_dir = tempfile::tempdir().unwrap();
    let output = Utf8PathBuf::from_path_buf(output_dir.path().join("agg.csv")).unwrap();

    let aggregation = aggregate(
        &LocalObjectStore,
        &AggregateRequest {
            location,
            suffix: SUFFIX.to_string(),
            workers: 2,
            scratch_root: None,
        },
    )
    .unwrap();
    aggregation.table.write_csv(&output).unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "species,species_tax_id,sample_name,relative_abundance\n\
         Anaerostipes hadrus,649756,BC000217_002,12.5\n"
    );
}
