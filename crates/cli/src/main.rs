use clap::{Parser, Subcommand};
use records::RecordKind;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transformer_core::{
    config::{clinical_only_policy_from_env_value, dir_from_env_value},
    constants::{DEFAULT_CACHE_DATA_DIR, DEFAULT_PARSED_DATA_DIR, DEFAULT_RAW_DATA_DIR},
    CoreConfig, DataService, Processor,
};

#[derive(Parser)]
#[command(name = "rt")]
#[command(about = "Record transformer operator CLI")]
struct Cli {
    /// Raw export root (overrides RAW_DATA_DIR)
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,
    /// Parsed output root (overrides PARSED_DATA_DIR)
    #[arg(long, global = true)]
    parsed_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directories and list discovered facilities
    Setup,
    /// Run one processing pass over all facilities
    Process {
        /// Process even when anonymized demo data is present
        #[arg(long)]
        force: bool,
    },
    /// Print the service status document
    Status,
    /// Print the resident index
    Residents,
    /// Print one resident document
    Resident {
        /// Resident ID
        id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("transformer_core=info".parse()?)
                .add_directive("records=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = Arc::new(build_config(&cli)?);

    match cli.command {
        Some(Commands::Setup) => setup(&cfg)?,
        Some(Commands::Process { force }) => {
            if cfg.demo_mode() && !force {
                eprintln!(
                    "Demo data present at {}; refusing to process (use --force to override).",
                    cfg.anonymized_index_path().display()
                );
                std::process::exit(1);
            }
            cfg.ensure_directories()?;
            let result = Processor::new(cfg.clone()).run()?;
            print_json(&result)?;
        }
        Some(Commands::Status) => print_json(&DataService::new(cfg).get_status()?)?,
        Some(Commands::Residents) => print_json(&DataService::new(cfg).get_residents()?)?,
        Some(Commands::Resident { id }) => match DataService::new(cfg).get_resident(&id)? {
            Some(resident) => print_json(&resident)?,
            None => {
                eprintln!("Resident not found: {}", id);
                std::process::exit(1);
            }
        },
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let raw = cli.raw_dir.clone().unwrap_or_else(|| {
        dir_from_env_value(std::env::var("RAW_DATA_DIR").ok(), DEFAULT_RAW_DATA_DIR)
    });
    let parsed = cli.parsed_dir.clone().unwrap_or_else(|| {
        dir_from_env_value(std::env::var("PARSED_DATA_DIR").ok(), DEFAULT_PARSED_DATA_DIR)
    });
    let cache = dir_from_env_value(std::env::var("CACHE_DATA_DIR").ok(), DEFAULT_CACHE_DATA_DIR);
    let policy = clinical_only_policy_from_env_value(std::env::var("CLINICAL_ONLY_POLICY").ok())?;

    Ok(CoreConfig::new(raw, parsed, cache).with_clinical_only_policy(policy))
}

/// One line per facility: its name and the exports it is missing.
fn facility_report(cfg: &CoreConfig) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let processor = Processor::new(Arc::new(cfg.clone()));
    let mut lines = Vec::new();
    for dir in processor.facility_dirs()? {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let missing: Vec<&str> = RecordKind::ALL
            .into_iter()
            .map(RecordKind::file_name)
            .filter(|file| !dir.join(file).is_file())
            .collect();
        if missing.is_empty() {
            lines.push(format!("{name}: all exports present"));
        } else {
            lines.push(format!("{name}: missing {}", missing.join(", ")));
        }
    }
    Ok(lines)
}

fn setup(cfg: &CoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    cfg.ensure_directories()?;
    println!("Raw data directory:    {}", cfg.raw_data_dir().display());
    println!("Parsed data directory: {}", cfg.parsed_data_dir().display());

    let report = facility_report(cfg)?;
    if report.is_empty() {
        println!(
            "No facilities found. Add one directory per facility under {}.",
            cfg.raw_data_dir().display()
        );
    } else {
        println!("Found {} facilities:", report.len());
        for line in report {
            println!("  {line}");
        }
    }

    if cfg.demo_mode() {
        println!("Demo data present: processing is disabled while the anonymized index exists.");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_process_with_force() {
        let cli = Cli::try_parse_from(["rt", "process", "--force"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Process { force: true })));

        let cli = Cli::try_parse_from(["rt", "--raw-dir", "/srv/raw", "resident", "5001"]).unwrap();
        assert_eq!(cli.raw_dir, Some(PathBuf::from("/srv/raw")));
        assert!(matches!(cli.command, Some(Commands::Resident { ref id }) if id == "5001"));
    }

    #[test]
    fn facility_report_lists_missing_exports() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let cfg = CoreConfig::new(
            temp.path().join("raw"),
            temp.path().join("parsed"),
            temp.path().join("cache"),
        );
        let facility = cfg.raw_data_dir().join("FAC_A");
        fs::create_dir_all(&facility).unwrap();
        fs::write(facility.join("Facesheet_data.html"), "<html></html>").unwrap();
        fs::write(facility.join("MED_data.html"), "<html></html>").unwrap();

        let report = facility_report(&cfg).unwrap();
        assert_eq!(
            report,
            vec!["FAC_A: missing TRE_data.html, Oth_data.html".to_string()]
        );
    }
}
