use std::str::FromStr;

use error_stack::Report;
use kernel::interface::query::LoanQuery;
use kernel::interface::update::LoanModifier;
use kernel::prelude::entity::{
    BookId, BorrowedAt, DueDate, LibraryId, Loan, LoanId, LoanStatus, ReturnedAt, SelectLimit,
    SelectOffset, UserId,
};
use kernel::KernelError;
use sqlx::PgConnection;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

pub struct PostgresLoanRepository;

#[async_trait::async_trait]
impl LoanQuery for PostgresLoanRepository {
    type Transaction = PostgresTransaction;

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        PgLoanInternal::find_by_id(con, library_id, id).await
    }

    async fn find_all(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::find_all(con, library_id, limit, offset).await
    }

    async fn find_by_user_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::find_by_user_id(con, library_id, user_id).await
    }

    async fn find_by_book_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::find_by_book_id(con, library_id, book_id).await
    }

    async fn find_by_user_and_book(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::find_by_user_and_book(con, library_id, user_id, book_id, statuses).await
    }

    async fn count_by_user_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        PgLoanInternal::count_by_user_id(con, library_id, user_id, statuses).await
    }

    async fn count_by_book_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        PgLoanInternal::count_by_book_id(con, library_id, book_id, statuses).await
    }
}

#[async_trait::async_trait]
impl LoanModifier for PostgresLoanRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError> {
        PgLoanInternal::create(con, loan).await
    }

    async fn update(
        &self,
        con: &mut PostgresTransaction,
        loan: &Loan,
        expected: &LoanStatus,
    ) -> error_stack::Result<(), KernelError> {
        PgLoanInternal::update(con, loan, expected).await
    }

    async fn mark_overdue(
        &self,
        con: &mut PostgresTransaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        PgLoanInternal::mark_overdue(con, now).await
    }
}

#[derive(sqlx::FromRow)]
struct LoanRow {
    id: Uuid,
    library_id: Uuid,
    book_id: Uuid,
    user_id: Uuid,
    status: String,
    borrowed_at: OffsetDateTime,
    due_date: OffsetDateTime,
    returned_at: Option<OffsetDateTime>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = Report<KernelError>;
    fn try_from(value: LoanRow) -> Result<Self, Self::Error> {
        Ok(Loan::new(
            LoanId::new(value.id),
            LibraryId::new(value.library_id),
            BookId::new(value.book_id),
            UserId::new(value.user_id),
            LoanStatus::from_str(&value.status)?,
            BorrowedAt::new(value.borrowed_at),
            DueDate::new(value.due_date),
            value.returned_at.map(ReturnedAt::new),
        ))
    }
}

fn status_names(statuses: &[LoanStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn into_loans(rows: Vec<LoanRow>) -> error_stack::Result<Vec<Loan>, KernelError> {
    rows.into_iter().map(Loan::try_from).collect()
}

pub(in crate::database) struct PgLoanInternal;

impl PgLoanInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        let row = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            FROM loans
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(id.as_ref())
        .bind(library_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Loan::try_from).transpose()
    }

    async fn find_all(
        con: &mut PgConnection,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            FROM loans
            WHERE library_id = $1
            ORDER BY borrowed_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(library_id.as_ref())
        .bind(limit.as_ref())
        .bind(offset.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        into_loans(rows)
    }

    async fn find_by_user_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            FROM loans
            WHERE library_id = $1 AND user_id = $2
            ORDER BY borrowed_at DESC
            "#,
        )
        .bind(library_id.as_ref())
        .bind(user_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        into_loans(rows)
    }

    async fn find_by_book_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            FROM loans
            WHERE library_id = $1 AND book_id = $2
            ORDER BY borrowed_at DESC
            "#,
        )
        .bind(library_id.as_ref())
        .bind(book_id.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        into_loans(rows)
    }

    async fn find_by_user_and_book(
        con: &mut PgConnection,
        library_id: &LibraryId,
        user_id: &UserId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            FROM loans
            WHERE library_id = $1 AND user_id = $2 AND book_id = $3 AND status = ANY($4)
            ORDER BY due_date
            "#,
        )
        .bind(library_id.as_ref())
        .bind(user_id.as_ref())
        .bind(book_id.as_ref())
        .bind(status_names(statuses))
        .fetch_all(con)
        .await
        .convert_error()?;
        into_loans(rows)
    }

    async fn count_by_user_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        user_id: &UserId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        sqlx::query_scalar::<_, i64>(
            // language=postgresql
            r#"
            SELECT COUNT(*)
            FROM loans
            WHERE library_id = $1 AND user_id = $2 AND status = ANY($3)
            "#,
        )
        .bind(library_id.as_ref())
        .bind(user_id.as_ref())
        .bind(status_names(statuses))
        .fetch_one(con)
        .await
        .convert_error()
    }

    async fn count_by_book_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        sqlx::query_scalar::<_, i64>(
            // language=postgresql
            r#"
            SELECT COUNT(*)
            FROM loans
            WHERE library_id = $1 AND book_id = $2 AND status = ANY($3)
            "#,
        )
        .bind(library_id.as_ref())
        .bind(book_id.as_ref())
        .bind(status_names(statuses))
        .fetch_one(con)
        .await
        .convert_error()
    }

    async fn create(con: &mut PgConnection, loan: &Loan) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO loans (id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(loan.id().as_ref())
        .bind(loan.library_id().as_ref())
        .bind(loan.book_id().as_ref())
        .bind(loan.user_id().as_ref())
        .bind(loan.status().as_str())
        .bind(loan.borrowed_at().as_ref())
        .bind(loan.due_date().as_ref())
        .bind(loan.returned_at().map(|at| *at.as_ref()))
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn update(
        con: &mut PgConnection,
        loan: &Loan,
        expected: &LoanStatus,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET status = $4, due_date = $5, returned_at = $6
            WHERE id = $1 AND library_id = $2 AND status = $3
            "#,
        )
        .bind(loan.id().as_ref())
        .bind(loan.library_id().as_ref())
        .bind(expected.as_str())
        .bind(loan.status().as_str())
        .bind(loan.due_date().as_ref())
        .bind(loan.returned_at().map(|at| *at.as_ref()))
        .execute(con)
        .await
        .convert_error()?;
        if result.rows_affected() == 0 {
            return Err(Report::new(KernelError::Concurrency).attach_printable(format!(
                "loan {} is no longer {expected}",
                loan.id().as_ref()
            )));
        }
        Ok(())
    }

    async fn mark_overdue(
        con: &mut PgConnection,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let rows = sqlx::query_as::<_, LoanRow>(
            // language=postgresql
            r#"
            UPDATE loans
            SET status = 'overdue'
            WHERE status = 'active' AND due_date < $1
            RETURNING id, library_id, book_id, user_id, status, borrowed_at, due_date, returned_at
            "#,
        )
        .bind(now)
        .fetch_all(con)
        .await
        .convert_error()?;
        into_loans(rows)
    }
}
