use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

use profile_reads_utils::aggregate::{AggregateRequest, aggregate, default_workers};
use profile_reads_utils::domain::ObjectLocation;
use profile_reads_utils::error::ProfileError;
use profile_reads_utils::output::{JsonOutput, RunSummary};
use profile_reads_utils::s3::S3ObjectStore;
use profile_reads_utils::store::LocalObjectStore;
use profile_reads_utils::table::validate_output_path;

#[derive(Parser)]
#[command(name = "aggregate-profiles")]
#[command(about = "Aggregate per-sample MetaPhlAn species abundances into one long-format CSV")]
#[command(
    after_help = "Example:\n  aggregate-profiles \\\n    --s3prefix s3://gwfcore-results/Results/Reads-Profiler/2021_10_12_CP04021-A \\\n    --suffix metaphlan_bugs_list.tsv \\\n    --output 2021_10_12_CP04021-A.metaphlan_agg_rel_ab.csv"
)]
#[command(version)]
struct Cli {
    /// Common path prefix that contains all the files to be aggregated
    #[arg(short = 'p', long = "s3prefix", value_name = "URI")]
    s3prefix: String,

    /// The unique extension/suffix of the files to aggregate
    #[arg(short, long)]
    suffix: String,

    /// Aggregated output file
    #[arg(short, long)]
    output: Utf8PathBuf,

    /// Number of workers available for this task
    #[arg(short, long)]
    cores: Option<usize>,

    /// AWS CLI profile to use, if other than the default
    #[arg(long)]
    profile: Option<String>,

    /// Directory for per-object scratch space
    #[arg(long, value_name = "DIR")]
    scratch_dir: Option<Utf8PathBuf>,

    /// Print a JSON run summary to stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ProfileError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ProfileError) -> u8 {
    match error {
        ProfileError::InvalidLocation(_)
        | ProfileError::NoMatchingObjects { .. }
        | ProfileError::InvalidOutput(_) => 2,
        ProfileError::Listing { .. }
        | ProfileError::Download { .. }
        | ProfileError::StorageSetup(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let location: ObjectLocation = cli.s3prefix.parse()?;
    validate_output_path(&cli.output)?;

    let started_at = chrono::Utc::now();
    let request = AggregateRequest {
        location: location.clone(),
        suffix: cli.suffix.clone(),
        workers: cli.cores.unwrap_or_else(default_workers).max(1),
        scratch_root: cli.scratch_dir.clone(),
    };
    info!(
        "Aggregating {} with suffix {:?} on {} workers",
        location, request.suffix, request.workers
    );

    let aggregation = if location.is_s3() {
        let store = S3ObjectStore::new(cli.profile.as_deref())?;
        aggregate(&store, &request)?
    } else {
        aggregate(&LocalObjectStore, &request)?
    };

    aggregation.table.write_csv(&cli.output)?;
    info!("Wrote {} rows to {}", aggregation.table.len(), cli.output);

    if cli.json {
        let summary = RunSummary::new(
            &location,
            &cli.suffix,
            &aggregation,
            cli.output.as_str(),
            started_at,
        );
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn exit_codes_by_failure_class() {
        let usage = ProfileError::NoMatchingObjects {
            location: "s3://results/run".to_string(),
            suffix: ".tsv".to_string(),
        };
        assert_eq!(map_exit_code(&usage), 2);
        assert_eq!(map_exit_code(&ProfileError::InvalidLocation("gs://x".to_string())), 2);
        assert_eq!(map_exit_code(&ProfileError::InvalidOutput(PathBuf::from("out/"))), 2);

        let storage = ProfileError::Listing {
            bucket: "results".to_string(),
            prefix: "run".to_string(),
            message: "AccessDenied".to_string(),
        };
        assert_eq!(map_exit_code(&storage), 3);
        assert_eq!(map_exit_code(&ProfileError::StorageSetup("no region".to_string())), 3);

        let parse = ProfileError::MalformedProfile {
            path: PathBuf::from("S1.tsv"),
            line: 4,
            message: "relative abundance \"x\" is not a number".to_string(),
        };
        assert_eq!(map_exit_code(&parse), 1);
    }
}
