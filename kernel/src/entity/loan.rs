mod borrowed_at;
mod due_date;
mod id;
mod notification;
mod returned_at;
mod status;

pub use self::{
    borrowed_at::*, due_date::*, id::*, notification::*, returned_at::*, status::*,
};
use crate::entity::{BookId, LibraryId, UserId};
use crate::KernelError;
use destructure::{Destructure, Mutation};
use error_stack::Report;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct Loan {
    id: LoanId,
    library_id: LibraryId,
    book_id: BookId,
    user_id: UserId,
    status: LoanStatus,
    borrowed_at: BorrowedAt,
    due_date: DueDate,
    returned_at: Option<ReturnedAt>,
}

impl Loan {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: LoanId,
        library_id: LibraryId,
        book_id: BookId,
        user_id: UserId,
        status: LoanStatus,
        borrowed_at: BorrowedAt,
        due_date: DueDate,
        returned_at: Option<ReturnedAt>,
    ) -> Self {
        Self {
            id,
            library_id,
            book_id,
            user_id,
            status,
            borrowed_at,
            due_date,
            returned_at,
        }
    }

    pub fn open(
        library_id: LibraryId,
        book_id: BookId,
        user_id: UserId,
        status: LoanStatus,
        now: OffsetDateTime,
        duration: Duration,
    ) -> error_stack::Result<Self, KernelError> {
        Ok(Self::new(
            LoanId::new(Uuid::new_v4()),
            library_id,
            book_id,
            user_id,
            status,
            BorrowedAt::new(now),
            DueDate::after(now, duration)?,
            None,
        ))
    }

    /// Moves the loan along a caller-requested edge and reports the side
    /// effects the new state requires.
    pub fn transit(
        self,
        to: LoanStatus,
        now: OffsetDateTime,
    ) -> error_stack::Result<(Self, Transition), KernelError> {
        let transition = self.status.transition(&to)?;
        let returned_at = transition.stamps_return().then(|| ReturnedAt::new(now));
        let loan = self.reconstruct(|loan| {
            loan.status = to;
            if returned_at.is_some() {
                loan.returned_at = returned_at;
            }
        });
        Ok((loan, transition))
    }

    /// Overdue loans given a future due date become active again.
    pub fn extend(
        self,
        due_date: DueDate,
        now: OffsetDateTime,
    ) -> error_stack::Result<Self, KernelError> {
        if self.status.is_terminal() {
            return Err(Report::new(KernelError::InvalidTransition)
                .attach_printable(format!("cannot extend a {} loan", self.status)));
        }
        if self.due_date == due_date {
            return Err(Report::new(KernelError::InvalidInput)
                .attach_printable("new due date equals the current one"));
        }
        let status = match self.status {
            LoanStatus::Overdue if *due_date.as_ref() > now => LoanStatus::Active,
            status => status,
        };
        Ok(self.reconstruct(|loan| {
            loan.due_date = due_date;
            loan.status = status;
        }))
    }

    pub fn is_past_due(&self, now: OffsetDateTime) -> bool {
        *self.due_date.as_ref() < now
    }

    pub fn mark_overdue(self, now: OffsetDateTime) -> error_stack::Result<Self, KernelError> {
        let status = self.status.reclassify_overdue()?;
        if !self.is_past_due(now) {
            return Err(Report::new(KernelError::InvalidTransition)
                .attach_printable("loan is not past its due date"));
        }
        Ok(self.reconstruct(|loan| loan.status = status))
    }
}
