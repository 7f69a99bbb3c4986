use std::io::Write;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use profile_reads_utils::config::ConfigLoader;
use profile_reads_utils::error::ProfileError;
use profile_reads_utils::versions::{render, scrape};

#[derive(Parser)]
#[command(name = "scrape-versions")]
#[command(about = "Collect tool versions into a MultiQC software-versions section")]
#[command(version)]
struct Cli {
    /// Directory holding the v_*.txt version files
    #[arg(long, default_value = ".")]
    dir: Utf8PathBuf,

    /// JSON file describing the tracked tools
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Write the section here instead of stdout
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(ProfileError::ConfigRead(_) | ProfileError::ConfigParse(_)) =
            report.downcast_ref::<ProfileError>()
        {
            return ExitCode::from(2);
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
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
    let report = ConfigLoader::resolve(cli.config.as_deref().map(|path| path.as_std_path()))?;
    let versions = scrape(&report, cli.dir.as_std_path())?;
    let section = render(&report, &versions);

    match cli.output {
        Some(path) => std::fs::write(path.as_std_path(), section).into_diagnostic()?,
        None => std::io::stdout()
            .write_all(section.as_bytes())
            .into_diagnostic()?,
    }
    Ok(())
}
