mod book;
mod library;
mod loan;
mod overdue;
mod tenant;
mod user;

pub use self::{book::*, library::*, loan::*, overdue::*, tenant::*, user::*};

use kernel::interface::notify::LoanNotifier;
use kernel::prelude::entity::{LoanId, NotificationKind};

// Runs after commit, so a delivery failure must not surface as a failed operation.
async fn notify_quietly<N: LoanNotifier>(notifier: &N, loan_id: &LoanId, kind: NotificationKind) {
    if let Err(report) = notifier.notify(loan_id, kind).await {
        tracing::warn!(loan_id = %loan_id.as_ref(), %kind, "notification failed: {report:?}");
    }
}
