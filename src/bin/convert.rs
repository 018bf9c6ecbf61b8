use rankings::{Config, ingest_path};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// Converts a rankings workbook into the JSON snapshot served by the web app.
///
/// Usage: convert <workbook.xlsx> [data-dir]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <workbook.xlsx> [data-dir]", args[0]);
        return ExitCode::from(2);
    }

    let mut config = Config::from_env();
    if let Some(dir) = args.get(2) {
        config.data_dir = PathBuf::from(dir);
    }

    let report = match ingest_path(&args[1]) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for dropped in &report.dropped_rows {
        eprintln!("  {} row {}: {}", dropped.sheet, dropped.row, dropped.reason);
    }

    let store = config.snapshot_store();
    match store.write(&report.data) {
        Ok(outcome) => {
            println!("Converted {}: {}", args[1], report.summary());
            println!("Snapshot: {}", store.path().display());
            if let Some(backup) = outcome.backup {
                println!("Backup: {}", backup.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
