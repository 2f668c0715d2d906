use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use validex::{
    fail, JsonRecord, MappedValidator, ManagerConfig, ParamType, Parameters, Record,
    ValidationManager, ValidatorBuilder,
};

/// Runs a small illustrative validator set over a JSON-lines file of
/// records and prints a human summary of the result.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a file with one JSON object per line
    #[arg(default_value = "data/records.jsonl")]
    file: PathBuf,

    /// Print every error, not just the summary counts
    #[arg(short, long)]
    verbose: bool,
}

fn demo_manager() -> Result<ValidationManager, validex::EngineError> {
    let mut manager = ValidationManager::new(ManagerConfig::default());

    let non_negative_age = ValidatorBuilder::new("non_negative_age")
        .param("age", ParamType::Int)
        .build(|params: Parameters| async move {
            let age = params.get("age").expect("declared required parameter").value.as_i64().unwrap_or(0);
            if age < 0 {
                Err(fail!("age must not be negative, got {age}"))
            } else {
                Ok(())
            }
        })?;
    let age_map: BTreeMap<String, String> = [("age".to_string(), "age".to_string())].into();
    manager.register(MappedValidator::path_mapped(non_negative_age, vec![age_map])?, &[], None)?;

    let email_has_at = ValidatorBuilder::new("email_has_at_sign")
        .param("email", ParamType::Str)
        .is_async(true)
        .build(|params: Parameters| async move {
            let email = params
                .get("email")
                .expect("declared required parameter")
                .value
                .as_str()
                .unwrap_or_default()
                .to_string();
            if email.contains('@') {
                Ok(())
            } else {
                Err(fail!("'{email}' is not a valid email address"))
            }
        })?;
    let email_map: BTreeMap<String, String> = [("email".to_string(), "email".to_string())].into();
    manager.register(MappedValidator::path_mapped(email_has_at, vec![email_map])?, &[], None)?;

    Ok(manager)
}

fn load_records(path: &PathBuf) -> std::io::Result<Vec<Arc<dyn Record>>> {
    let file = std::fs::File::open(path)?;
    std::io::BufReader::new(file)
        .lines()
        .enumerate()
        .filter(|(_, line)| line.as_ref().map(|l| !l.trim().is_empty()).unwrap_or(true))
        .map(|(i, line)| {
            let line = line?;
            let value: serde_json::Value = serde_json::from_str(&line)?;
            let id = value
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("record-{i}"));
            Ok(Arc::new(JsonRecord::new(id, value)) as Arc<dyn Record>)
        })
        .collect()
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    debug!("loading records from {:?}", cli.file);
    let records = load_records(&cli.file)?;
    info!(count = records.len(), "loaded records");

    let manager = demo_manager()?;
    let result = manager.validate(records, Some(true)).await;

    println!(
        "{} succeeded, {} failed, {} errors total",
        result.num_succeeds(),
        result.num_fails(),
        result.num_errors_total()
    );

    if cli.verbose {
        for error in result.all_errors() {
            println!("{error}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
