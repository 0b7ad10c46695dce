// Service configuration
// Loaded once at startup and handed to whatever needs it

use anyhow::{anyhow, Result};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::info;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DB_PATH: &str = "employees.db";
pub const DEFAULT_DUMP_PATH: &str = "./dump.txt";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    /// SQLite file backing the employee store
    pub db_path: PathBuf,
    /// Dump read by the import operation
    pub dump_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
        }
    }
}

impl Config {
    /// Read `APP_PORT`, `EMPLOYEE_DB_PATH` and `DUMP_PATH` from the
    /// environment, falling back to defaults for unset variables.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            port: try_load(&lookup, "APP_PORT", DEFAULT_PORT)?,
            db_path: try_load(&lookup, "EMPLOYEE_DB_PATH", PathBuf::from(DEFAULT_DB_PATH))?,
            dump_path: try_load(&lookup, "DUMP_PATH", PathBuf::from(DEFAULT_DUMP_PATH))?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} value {:?}: {}", key, raw, e)),
        None => {
            info!("{key} not set, using default: {default:?}");
            Ok(default)
        }
    }
}
