use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::notify::DependOnLoanNotifier;
use kernel::interface::update::{DependOnLoanModifier, LoanModifier};
use kernel::prelude::entity::NotificationKind;
use kernel::KernelError;
use time::OffsetDateTime;

use crate::service::notify_quietly;

#[async_trait::async_trait]
pub trait OverdueSweepService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnLoanModifier + DependOnLoanNotifier
{
    /// Reclassifies every active loan past its due date, in all libraries.
    /// Returns how many loans became overdue.
    async fn sweep_overdue(&self, now: OffsetDateTime) -> error_stack::Result<usize, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let loans = self.loan_modifier().mark_overdue(&mut connection, &now).await?;
        connection.commit().await?;

        if !loans.is_empty() {
            tracing::info!(count = loans.len(), "loans marked overdue");
        }
        for loan in &loans {
            notify_quietly(self.loan_notifier(), loan.id(), NotificationKind::OverdueLoan).await;
        }
        Ok(loans.len())
    }
}

impl<T> OverdueSweepService for T where
    T: DependOnDatabaseConnection + DependOnLoanModifier + DependOnLoanNotifier
{
}
