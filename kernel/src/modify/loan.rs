use time::OffsetDateTime;

use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{Loan, LoanStatus};
use crate::KernelError;

#[async_trait::async_trait]
pub trait LoanModifier: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn create(
        &self,
        con: &mut Self::Transaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError>;

    /// Writes status, due date and return stamp only if the stored status is
    /// still `expected`; fails with `Concurrency` otherwise.
    async fn update(
        &self,
        con: &mut Self::Transaction,
        loan: &Loan,
        expected: &LoanStatus,
    ) -> error_stack::Result<(), KernelError>;

    /// Reclassifies every active loan due before `now` across all libraries.
    async fn mark_overdue(
        &self,
        con: &mut Self::Transaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Loan>, KernelError>;
}

pub trait DependOnLoanModifier: 'static + Sync + Send + DependOnDatabaseConnection {
    type LoanModifier: LoanModifier<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn loan_modifier(&self) -> &Self::LoanModifier;
}
