use error_stack::{Report, ResultExt};
use kernel::prelude::entity::{
    DestructLoan, DueDate, Loan, SelectLimit, SelectOffset,
};
use kernel::KernelError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct LoanDto {
    pub id: Uuid,
    pub library_id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub borrowed_at: String,
    pub due_date: String,
    pub returned_at: Option<String>,
}

impl TryFrom<Loan> for LoanDto {
    type Error = Report<KernelError>;

    fn try_from(value: Loan) -> Result<Self, Self::Error> {
        let DestructLoan {
            id,
            library_id,
            book_id,
            user_id,
            status,
            borrowed_at,
            due_date,
            returned_at,
        } = value.into_destruct();
        Ok(Self {
            id: id.into(),
            library_id: library_id.into(),
            book_id: book_id.into(),
            user_id: user_id.into(),
            status: status.to_string(),
            borrowed_at: format_time(borrowed_at.into())?,
            due_date: format_time(due_date.into())?,
            returned_at: returned_at
                .map(|at| format_time(at.into()))
                .transpose()?,
        })
    }
}

fn format_time(time: OffsetDateTime) -> error_stack::Result<String, KernelError> {
    time.format(&Rfc3339)
        .change_context_lazy(|| KernelError::Internal)
        .attach_printable_lazy(|| format!("cannot format {time} as RFC 3339"))
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub(crate) fn parse_due_date(input: Option<&str>) -> error_stack::Result<DueDate, KernelError> {
    let raw = input.map(str::trim).filter(|raw| !raw.is_empty()).ok_or_else(|| {
        Report::new(KernelError::InvalidInput).attach_printable("due date is required")
    })?;
    if let Ok(time) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(DueDate::new(time));
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|date| DueDate::new(date.midnight().assume_utc()))
        .change_context_lazy(|| KernelError::InvalidInput)
        .attach_printable_lazy(|| format!("unparseable due date: {raw}"))
}

pub struct GetLoanDto {
    pub id: Uuid,
}

pub struct GetAllLoanDto {
    pub limit: SelectLimit,
    pub offset: SelectOffset,
}

pub struct GetLoansFromUserDto {
    pub user_id: Uuid,
}

pub struct GetLoansFromBookDto {
    pub book_id: Uuid,
}

pub struct CreateLoanDto {
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub duration_days: Option<i64>,
}

pub struct RequestLoanDto {
    pub book_id: Uuid,
}

pub struct TransitionLoanDto {
    pub id: Uuid,
    pub status: String,
}

pub struct ExtendLoanDto {
    pub id: Uuid,
    pub due_date: Option<String>,
}

/// Loan addressed by borrower name and book title, as chat tools do.
pub struct LoanByNamesDto {
    pub user_name: String,
    pub book_title: String,
}

pub struct RenewLoanDto {
    pub user_name: String,
    pub book_title: String,
    pub new_due_date: Option<String>,
}
