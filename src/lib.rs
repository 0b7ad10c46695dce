// Employee Rewards - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod models;
pub mod parser;
pub mod rewards;
pub mod store;
pub mod upload;

#[cfg(feature = "server")]
pub mod error;
#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use models::{Department, Employee, EmployeeDocument, Reward, Statement, StatementsField};
pub use parser::{parse_file, parse_str, parse_with_summary, ParseContext, ParseSummary};
pub use rewards::{calculate_rewards, calculate_rewards_with, RewardPolicy};
pub use store::{EmployeeStore, Event, SqliteStore, StoredRecord};
pub use upload::{upload_employees, UploadOutcome, UploadReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
