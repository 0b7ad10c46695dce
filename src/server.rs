// Employee Rewards - HTTP Surface
// REST API with Axum over the parser, uploader, store and reward calculator

use anyhow::{anyhow, Context};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Employee, Reward};
use crate::parser::parse_file;
use crate::rewards::calculate_rewards;
use crate::store::{EmployeeStore, SqliteStore};
use crate::upload::upload_employees;

/// Shared application state, built once at startup
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<Mutex<SqliteStore>>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn store(&self) -> anyhow::Result<MutexGuard<'_, SqliteStore>> {
        self.store.lock().map_err(|_| anyhow!("employee store lock poisoned"))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - Greeting
async fn hello() -> &'static str {
    "Hello, World!"
}

/// GET /import-data - Parse the dump file and append every employee
async fn import_data(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let employees = parse_file(&state.config.dump_path).map_err(AppError::Import)?;

    let mut store = state.store().map_err(AppError::Import)?;
    let written = upload_employees(&mut *store, &employees)
        .into_result()
        .map_err(AppError::Import)?;

    info!(written, "imported employees from {}", state.config.dump_path.display());
    Ok("Data imported successfully!")
}

/// GET /employees/:id - One employee by storage key
async fn get_employee(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Employee>, AppError> {
    let store = state.store().map_err(AppError::Internal)?;

    let record = store
        .get(&key)
        .with_context(|| format!("Failed to read employee {}", key))
        .map_err(AppError::Internal)?
        .ok_or(AppError::EmployeeNotFound)?;

    Ok(Json(record.document.into_employee()))
}

/// GET /calculate-rewards - Reward share for every qualifying employee
async fn get_rewards(State(state): State<AppState>) -> Result<Json<Vec<Reward>>, AppError> {
    let store = state.store().map_err(AppError::Rewards)?;
    let records = store.all().map_err(AppError::Rewards)?;

    if records.is_empty() {
        return Err(AppError::NoEmployeeData);
    }

    let rewards = calculate_rewards(records.iter().map(|r| (r.key.as_str(), &r.document)));
    Ok(Json(rewards))
}

// ============================================================================
// Main Server
// ============================================================================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/import-data", get(import_data))
        .route("/employees/:id", get(get_employee))
        .route("/calculate-rewards", get(get_rewards))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Open the store, bind, and serve until Ctrl+C or SIGTERM
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(&config.db_path)?;
    info!("Store opened: {}", config.db_path.display());

    let address = config.bind_address();
    let app = router(AppState::new(config, store));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to {}", address))?;
    info!("Running a server at http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
