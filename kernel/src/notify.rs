use crate::entity::{LoanId, NotificationKind};
use crate::KernelError;

/// Hands a loan event to the delivery side (mail, push, ...).
///
/// Callers treat failures as non-fatal: the loan change that triggered the
/// notification is already committed.
#[async_trait::async_trait]
pub trait LoanNotifier: 'static + Sync + Send {
    async fn notify(
        &self,
        loan_id: &LoanId,
        kind: NotificationKind,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnLoanNotifier: 'static + Sync + Send {
    type LoanNotifier: LoanNotifier;
    fn loan_notifier(&self) -> &Self::LoanNotifier;
}
