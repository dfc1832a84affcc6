use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use error_stack::{Report, ResultExt};
use kernel::prelude::entity::{loan_period, LoanPolicy, OverflowPolicy};
use kernel::KernelError;
use time::Duration;

const BIND_ADDR: &str = "BIND_ADDR";
const LOAN_LIMIT: &str = "LOAN_LIMIT";
const LOAN_DAYS: &str = "LOAN_DAYS";
const CHAT_LOAN_DAYS: &str = "CHAT_LOAN_DAYS";
const RENEW_DAYS: &str = "RENEW_DAYS";
const RETURN_OVERFLOW_POLICY: &str = "RETURN_OVERFLOW_POLICY";
const OVERDUE_SWEEP_SECS: &str = "OVERDUE_SWEEP_SECS";

fn optional<T>(key: &str) -> error_stack::Result<Option<T>, KernelError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenvy::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .change_context_lazy(|| KernelError::InvalidInput)
            .attach_printable_lazy(|| format!("Env {key} has an invalid value: {raw}")),
        Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => Ok(None),
        Err(error) => Err(Report::new(error).change_context(KernelError::Internal)),
    }
}

fn period_days(key: &str, default: i64) -> error_stack::Result<Duration, KernelError> {
    let days = optional::<i64>(key)?.unwrap_or(default);
    loan_period(days).attach_printable_lazy(|| format!("Env {key} is out of range"))
}

/// Builds the lending rules from the environment, falling back to the
/// defaults of [`LoanPolicy`] for anything unset.
pub fn load_loan_policy() -> error_stack::Result<LoanPolicy, KernelError> {
    let defaults = LoanPolicy::default();
    let limit = optional::<i64>(LOAN_LIMIT)?.unwrap_or(*defaults.max_outstanding());
    if limit < 1 {
        return Err(Report::new(KernelError::InvalidInput)
            .attach_printable(format!("Env {LOAN_LIMIT} must be at least 1, got {limit}")));
    }
    let overflow = match dotenvy::var(RETURN_OVERFLOW_POLICY) {
        Ok(raw) => OverflowPolicy::from_str(&raw)?,
        Err(_) => *defaults.overflow(),
    };
    Ok(LoanPolicy::new(
        limit,
        period_days(LOAN_DAYS, defaults.loan_duration().whole_days())?,
        period_days(CHAT_LOAN_DAYS, defaults.chat_loan_duration().whole_days())?,
        period_days(RENEW_DAYS, defaults.renew_extension().whole_days())?,
        overflow,
    ))
}

pub fn bind_addr() -> error_stack::Result<SocketAddr, KernelError> {
    Ok(optional(BIND_ADDR)?.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))))
}

pub fn overdue_sweep_interval() -> error_stack::Result<StdDuration, KernelError> {
    let secs = optional::<u64>(OVERDUE_SWEEP_SECS)?.unwrap_or(3600);
    if secs == 0 {
        return Err(Report::new(KernelError::InvalidInput)
            .attach_printable(format!("Env {OVERDUE_SWEEP_SECS} must be positive")));
    }
    Ok(StdDuration::from_secs(secs))
}
