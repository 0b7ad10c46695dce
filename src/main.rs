use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use employee_rewards::{
    calculate_rewards, parse_file, upload_employees, Config, EmployeeStore, SqliteStore,
};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();
    let config = Config::load()?;

    match args.get(1).map(String::as_str) {
        Some("import") => run_import(&config, args.get(2).map(PathBuf::from)),
        Some("show") => match args.get(2) {
            Some(key) => run_show(&config, key),
            None => bail!("Usage: employee-rewards show <key>"),
        },
        Some("rewards") => run_rewards(&config),
        _ => {
            eprintln!("Usage: employee-rewards <import [dump-file] | show <key> | rewards>");
            std::process::exit(2);
        }
    }
}

fn run_import(config: &Config, dump_path: Option<PathBuf>) -> Result<()> {
    let dump_path = dump_path.unwrap_or_else(|| config.dump_path.clone());

    println!("📂 Parsing {}...", dump_path.display());
    let employees = parse_file(&dump_path)?;
    println!("✓ Parsed {} employees", employees.len());

    let mut store = SqliteStore::open(&config.db_path)?;
    println!("💾 Writing to {}...", config.db_path.display());

    let report = upload_employees(&mut store, &employees);
    for key in report.keys() {
        println!("  ✓ {}", key);
    }

    let written = report.into_result()?;
    println!("✅ Imported {} employees ({} total in store)", written, store.count()?);

    Ok(())
}

fn run_show(config: &Config, key: &str) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;

    match store.get(key)? {
        Some(record) => {
            let employee = record.document.into_employee();
            println!("{}", serde_json::to_string_pretty(&employee)?);
            Ok(())
        }
        None => bail!("Employee not found: {}", key),
    }
}

fn run_rewards(config: &Config) -> Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    let records = store.all().context("Failed to read employees")?;

    if records.is_empty() {
        bail!("No employee data found.");
    }

    let rewards = calculate_rewards(records.iter().map(|r| (r.key.as_str(), &r.document)));
    println!("{}", serde_json::to_string_pretty(&rewards)?);

    Ok(())
}
