use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the HTTP handlers.
///
/// Callers only ever see the generic message; the underlying cause is
/// logged when the response is built.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Employee not found")]
    EmployeeNotFound,

    #[error("No employee data found.")]
    NoEmployeeData,

    #[error("Error importing data")]
    Import(anyhow::Error),

    #[error("Failed to calculate rewards")]
    Rewards(anyhow::Error),

    #[error("Internal Server Error")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::EmployeeNotFound | AppError::NoEmployeeData => StatusCode::NOT_FOUND,
            AppError::Import(_) | AppError::Rewards(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Import(e) => error!("Failed to import data: {:#}", e),
            AppError::Rewards(e) => error!("Failed to calculate rewards: {:#}", e),
            AppError::Internal(e) => error!("Error fetching employee: {:#}", e),
            AppError::EmployeeNotFound | AppError::NoEmployeeData => {}
        }

        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::EmployeeNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NoEmployeeData.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Import(anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_message_hides_cause() {
        let err = AppError::Internal(anyhow!("secret connection string"));
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
