use error_stack::Report;
use kernel::interface::update::InventoryLedger;
use kernel::prelude::entity::{BookId, BookInventory, LibraryId, OverflowPolicy, Restock};
use kernel::KernelError;
use sqlx::PgConnection;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

/// Every adjustment is one conditional `UPDATE`; the row lock it takes
/// serialises concurrent borrowers of the same book.
pub struct PostgresInventoryLedger;

#[async_trait::async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    type Transaction = PostgresTransaction;

    async fn decrement(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        PgLedgerInternal::decrement(con, library_id, book_id).await
    }

    async fn increment(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        policy: &OverflowPolicy,
    ) -> error_stack::Result<Restock, KernelError> {
        PgLedgerInternal::increment(con, library_id, book_id, policy).await
    }

    async fn set_stock_and_available(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        PgLedgerInternal::set_stock_and_available(con, library_id, book_id, inventory).await
    }
}

pub(in crate::database) struct PgLedgerInternal;

impl PgLedgerInternal {
    async fn exists(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<bool, KernelError> {
        sqlx::query_scalar::<_, bool>(
            // language=postgresql
            r#"
            SELECT EXISTS(SELECT 1 FROM books WHERE id = $1 AND library_id = $2)
            "#,
        )
        .bind(book_id.as_ref())
        .bind(library_id.as_ref())
        .fetch_one(con)
        .await
        .convert_error()
    }

    fn not_found(book_id: &BookId) -> Report<KernelError> {
        Report::new(KernelError::NotFound)
            .attach_printable(format!("book {} not found", book_id.as_ref()))
    }

    async fn decrement(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            UPDATE books
            SET available = available - 1
            WHERE id = $1 AND library_id = $2 AND available > 0
            "#,
        )
        .bind(book_id.as_ref())
        .bind(library_id.as_ref())
        .execute(&mut *con)
        .await
        .convert_error()?;
        if result.rows_affected() == 1 {
            return Ok(());
        }
        if Self::exists(con, library_id, book_id).await? {
            Err(Report::new(KernelError::Unavailable)
                .attach_printable(format!("no copy of book {} is left", book_id.as_ref())))
        } else {
            Err(Self::not_found(book_id))
        }
    }

    async fn increment(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
        policy: &OverflowPolicy,
    ) -> error_stack::Result<Restock, KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            UPDATE books
            SET available = available + 1
            WHERE id = $1 AND library_id = $2 AND available < stock
            "#,
        )
        .bind(book_id.as_ref())
        .bind(library_id.as_ref())
        .execute(&mut *con)
        .await
        .convert_error()?;
        if result.rows_affected() == 1 {
            return Ok(Restock::Restored);
        }
        if !Self::exists(con, library_id, book_id).await? {
            return Err(Self::not_found(book_id));
        }
        match policy {
            OverflowPolicy::Clamp => Ok(Restock::Clamped),
            OverflowPolicy::Reject => Err(Report::new(KernelError::InventoryOverflow)
                .attach_printable(format!(
                    "book {} already has every copy on the shelf",
                    book_id.as_ref()
                ))),
        }
    }

    async fn set_stock_and_available(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock = $3, available = $4
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(book_id.as_ref())
        .bind(library_id.as_ref())
        .bind(inventory.stock())
        .bind(inventory.available())
        .execute(con)
        .await
        .convert_error()?;
        if result.rows_affected() == 0 {
            return Err(Self::not_found(book_id));
        }
        Ok(())
    }
}
