use std::str::FromStr;

use error_stack::Report;
use time::Duration;
use vodca::References;

use crate::KernelError;

/// What to do when a return would push `available` above `stock`.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum OverflowPolicy {
    #[default]
    Clamp,
    Reject,
}

impl FromStr for OverflowPolicy {
    type Err = Report<KernelError>;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(Report::new(KernelError::InvalidInput)
                .attach_printable(format!("Unknown overflow policy: {other}"))),
        }
    }
}

/// Longest loan or renewal period accepted, in days.
pub const MAX_LOAN_DAYS: i64 = 3650;

/// Turns an outside day count into a loan period.
pub fn loan_period(days: i64) -> error_stack::Result<Duration, KernelError> {
    if !(1..=MAX_LOAN_DAYS).contains(&days) {
        return Err(Report::new(KernelError::InvalidInput).attach_printable(format!(
            "loan period must be between 1 and {MAX_LOAN_DAYS} days, got {days}"
        )));
    }
    Ok(Duration::days(days))
}

#[derive(Debug, Clone, References)]
pub struct LoanPolicy {
    /// Loans in `pending` or `active` a single user may hold at once.
    max_outstanding: i64,
    loan_duration: Duration,
    chat_loan_duration: Duration,
    renew_extension: Duration,
    overflow: OverflowPolicy,
}

impl LoanPolicy {
    pub fn new(
        max_outstanding: i64,
        loan_duration: Duration,
        chat_loan_duration: Duration,
        renew_extension: Duration,
        overflow: OverflowPolicy,
    ) -> Self {
        Self {
            max_outstanding,
            loan_duration,
            chat_loan_duration,
            renew_extension,
            overflow,
        }
    }
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_outstanding: 3,
            loan_duration: Duration::days(7),
            chat_loan_duration: Duration::days(14),
            renew_extension: Duration::days(14),
            overflow: OverflowPolicy::Clamp,
        }
    }
}

pub trait DependOnLoanPolicy: 'static + Sync + Send {
    fn loan_policy(&self) -> &LoanPolicy;
}
