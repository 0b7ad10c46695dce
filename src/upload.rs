// Uploader - sequential writes into the store
// One write per employee, in order; the first failure ends the run

use anyhow::{anyhow, Result};
use tracing::{error, info};

use crate::models::Employee;
use crate::store::EmployeeStore;

/// Result of one attempted write
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Written {
        index: usize,
        employee_id: Option<String>,
        key: String,
    },
    Failed {
        index: usize,
        employee_id: Option<String>,
        error: String,
    },
}

impl UploadOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, UploadOutcome::Written { .. })
    }
}

/// Per-item record of an upload run.
///
/// Records already written before a failure stay in the store; nothing is
/// rolled back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadReport {
    pub outcomes: Vec<UploadOutcome>,
    /// Employees never attempted because an earlier write failed
    pub skipped: usize,
}

impl UploadReport {
    pub fn written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_written()).count()
    }

    pub fn failure(&self) -> Option<&UploadOutcome> {
        self.outcomes.iter().find(|o| !o.is_written())
    }

    pub fn is_complete(&self) -> bool {
        self.failure().is_none() && self.skipped == 0
    }

    /// Storage keys of the written records, in write order
    pub fn keys(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                UploadOutcome::Written { key, .. } => Some(key.as_str()),
                UploadOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// Collapse into a plain result: `Ok(written)` or the first failure
    pub fn into_result(self) -> Result<usize> {
        match self.failure() {
            Some(UploadOutcome::Failed {
                index,
                employee_id,
                error,
            }) => Err(anyhow!(
                "Upload failed at record {} (id {:?}) after {} writes: {}",
                index,
                employee_id,
                self.written(),
                error
            )),
            _ => Ok(self.written()),
        }
    }
}

/// Write each employee in turn, awaiting nothing in parallel.
pub fn upload_employees(store: &mut dyn EmployeeStore, employees: &[Employee]) -> UploadReport {
    let mut report = UploadReport::default();

    for (index, employee) in employees.iter().enumerate() {
        match store.push(employee) {
            Ok(key) => report.outcomes.push(UploadOutcome::Written {
                index,
                employee_id: employee.id.clone(),
                key,
            }),
            Err(e) => {
                error!(
                    index,
                    employee_id = employee.id_or_empty(),
                    "Failed to store employee: {:#}",
                    e
                );
                report.outcomes.push(UploadOutcome::Failed {
                    index,
                    employee_id: employee.id.clone(),
                    error: format!("{:#}", e),
                });
                report.skipped = employees.len() - index - 1;
                return report;
            }
        }
    }

    info!(written = report.written(), "uploaded employees");
    report
}
