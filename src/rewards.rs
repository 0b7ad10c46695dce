// Reward Calculator
// Splits a fixed pool across employees whose statements exceed a threshold

use crate::models::{EmployeeDocument, Reward, StatementsField};

/// Statement totals must be strictly greater than this to qualify
pub const QUALIFYING_THRESHOLD: f64 = 100.0;

/// Amount shared across all qualifying employees
pub const REWARD_POOL: f64 = 10000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardPolicy {
    pub threshold: f64,
    pub pool: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        RewardPolicy {
            threshold: QUALIFYING_THRESHOLD,
            pool: REWARD_POOL,
        }
    }
}

/// Sum of statement amounts, or `None` when statements are absent or not a
/// sequence. A missing amount makes the whole sum NaN.
pub fn statement_total(employee: &EmployeeDocument) -> Option<f64> {
    match employee.statements.as_ref()? {
        StatementsField::Sequence(statements) => Some(
            statements
                .iter()
                .map(|s| s.amount.unwrap_or(f64::NAN))
                .sum(),
        ),
        _ => None,
    }
}

/// Rewards under the default policy (threshold 100, pool 10000)
pub fn calculate_rewards<'a, I>(employees: I) -> Vec<Reward>
where
    I: IntoIterator<Item = (&'a str, &'a EmployeeDocument)>,
{
    calculate_rewards_with(employees, RewardPolicy::default())
}

/// Rewards for every qualifying employee, in input order.
///
/// Each key is reported back as `employee_id`. Returns an empty list when
/// nobody qualifies instead of dividing by a zero total.
pub fn calculate_rewards_with<'a, I>(employees: I, policy: RewardPolicy) -> Vec<Reward>
where
    I: IntoIterator<Item = (&'a str, &'a EmployeeDocument)>,
{
    let mut qualifying: Vec<(&str, f64)> = Vec::new();
    let mut grand_total = 0.0;

    for (key, employee) in employees {
        // NaN never compares greater, so malformed amounts drop out here
        if let Some(total) = statement_total(employee).filter(|t| *t > policy.threshold) {
            grand_total += total;
            qualifying.push((key, total));
        }
    }

    if qualifying.is_empty() {
        return Vec::new();
    }

    qualifying
        .into_iter()
        .map(|(key, total)| Reward {
            employee_id: key.to_string(),
            reward: total / grand_total * policy.pool,
        })
        .collect()
}
