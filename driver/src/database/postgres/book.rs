use error_stack::Report;
use kernel::interface::query::BookQuery;
use kernel::interface::update::BookModifier;
use kernel::prelude::entity::{
    Book, BookAuthor, BookId, BookInventory, BookIsbn, BookTitle, LibraryId, SelectLimit,
    SelectOffset,
};
use kernel::KernelError;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::postgres::{like_pattern, PostgresTransaction};
use crate::error::ConvertError;

pub struct PostgresBookRepository;

#[async_trait::async_trait]
impl BookQuery for PostgresBookRepository {
    type Transaction = PostgresTransaction;

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        PgBookInternal::find_by_id(con, library_id, id).await
    }

    async fn lock_by_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        PgBookInternal::lock_by_id(con, library_id, id).await
    }

    async fn find_by_isbn(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        isbn: &BookIsbn,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        PgBookInternal::find_by_isbn(con, library_id, isbn).await
    }

    async fn find_by_title(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        title: &str,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        PgBookInternal::find_by_title(con, library_id, title).await
    }

    async fn find_all(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        PgBookInternal::find_all(con, library_id, limit, offset).await
    }
}

#[async_trait::async_trait]
impl BookModifier for PostgresBookRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::create(con, book).await
    }

    async fn update(
        &self,
        con: &mut PostgresTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::update(con, book).await
    }

    async fn delete(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        PgBookInternal::delete(con, library_id, book_id).await
    }
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    library_id: Uuid,
    title: String,
    author: String,
    isbn: String,
    stock: i32,
    available: i32,
}

impl TryFrom<BookRow> for Book {
    type Error = Report<KernelError>;
    fn try_from(value: BookRow) -> Result<Self, Self::Error> {
        Ok(Book::new(
            BookId::new(value.id),
            LibraryId::new(value.library_id),
            BookTitle::new(value.title),
            BookAuthor::new(value.author),
            BookIsbn::new(value.isbn),
            BookInventory::new(value.stock, value.available)?,
        ))
    }
}

pub(in crate::database) struct PgBookInternal;

impl PgBookInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, title, author, isbn, stock, available
            FROM books
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(id.as_ref())
        .bind(library_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Book::try_from).transpose()
    }

    async fn lock_by_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, title, author, isbn, stock, available
            FROM books
            WHERE id = $1 AND library_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id.as_ref())
        .bind(library_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Book::try_from).transpose()
    }

    async fn find_by_isbn(
        con: &mut PgConnection,
        library_id: &LibraryId,
        isbn: &BookIsbn,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        let row = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, title, author, isbn, stock, available
            FROM books
            WHERE library_id = $1 AND isbn = $2
            "#,
        )
        .bind(library_id.as_ref())
        .bind(isbn.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(Book::try_from).transpose()
    }

    async fn find_by_title(
        con: &mut PgConnection,
        library_id: &LibraryId,
        title: &str,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        let rows = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, title, author, isbn, stock, available
            FROM books
            WHERE library_id = $1 AND title ILIKE $2
            ORDER BY title
            "#,
        )
        .bind(library_id.as_ref())
        .bind(like_pattern(title))
        .fetch_all(con)
        .await
        .convert_error()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn find_all(
        con: &mut PgConnection,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        let rows = sqlx::query_as::<_, BookRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, title, author, isbn, stock, available
            FROM books
            WHERE library_id = $1
            ORDER BY title, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(library_id.as_ref())
        .bind(limit.as_ref())
        .bind(offset.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        rows.into_iter().map(Book::try_from).collect()
    }

    async fn create(con: &mut PgConnection, book: &Book) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO books (id, library_id, title, author, isbn, stock, available)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(book.id().as_ref())
        .bind(book.library_id().as_ref())
        .bind(book.title().as_ref())
        .bind(book.author().as_ref())
        .bind(book.isbn().as_ref())
        .bind(book.inventory().stock())
        .bind(book.inventory().available())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }

    async fn update(con: &mut PgConnection, book: &Book) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            UPDATE books
            SET title = $3, author = $4, isbn = $5
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(book.id().as_ref())
        .bind(book.library_id().as_ref())
        .bind(book.title().as_ref())
        .bind(book.author().as_ref())
        .bind(book.isbn().as_ref())
        .execute(con)
        .await
        .convert_error()?;
        if result.rows_affected() == 0 {
            return Err(Report::new(KernelError::NotFound)
                .attach_printable(format!("book {} not found", book.id().as_ref())));
        }
        Ok(())
    }

    async fn delete(
        con: &mut PgConnection,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        let result = sqlx::query(
            r#"
            DELETE FROM books
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(book_id.as_ref())
        .bind(library_id.as_ref())
        .execute(con)
        .await;
        match result {
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(Report::new(KernelError::HasActiveLoans).attach_printable(format!(
                    "book {} is referenced by loan records",
                    book_id.as_ref()
                )))
            }
            other => other.convert_error().map(|_| ()),
        }
    }
}

#[cfg(test)]
pub(in crate::database) mod test {
    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::query::BookQuery;
    use kernel::interface::update::BookModifier;
    use kernel::prelude::entity::{
        Book, BookAuthor, BookId, BookInventory, BookIsbn, BookTitle, LibraryId,
    };
    use kernel::KernelError;
    use uuid::Uuid;

    use crate::database::postgres::test::{committed, discard, seeded, short_lock_timeout};
    use crate::database::PostgresBookRepository;

    pub fn book(library_id: &LibraryId, title: &str, stock: i32) -> Book {
        let id = Uuid::new_v4();
        Book::new(
            BookId::new(id),
            library_id.clone(),
            BookTitle::new(title),
            BookAuthor::new("author"),
            BookIsbn::new(id.to_string()),
            BookInventory::fully_available(stock).unwrap(),
        )
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn test() -> error_stack::Result<(), KernelError> {
        let (mut con, library_id, _) = seeded().await?;
        let book = book(&library_id, "100% Pure", 2);
        PostgresBookRepository.create(&mut con, &book).await?;

        let found = PostgresBookRepository
            .find_by_id(&mut con, &library_id, book.id())
            .await?;
        assert_eq!(found, Some(book.clone()));

        let by_title = PostgresBookRepository
            .find_by_title(&mut con, &library_id, "0% p")
            .await?;
        assert_eq!(by_title, vec![book.clone()]);
        let wildcard = PostgresBookRepository
            .find_by_title(&mut con, &library_id, "1_0")
            .await?;
        assert!(wildcard.is_empty());

        let book = book.reconstruct(|b| b.title = BookTitle::new("test2"));
        PostgresBookRepository.update(&mut con, &book).await?;
        let found = PostgresBookRepository
            .find_by_isbn(&mut con, &library_id, book.isbn())
            .await?;
        assert_eq!(found, Some(book.clone()));

        let other = LibraryId::new(Uuid::new_v4());
        let hidden = PostgresBookRepository
            .find_by_id(&mut con, &other, book.id())
            .await?;
        assert!(hidden.is_none());

        PostgresBookRepository
            .delete(&mut con, &library_id, book.id())
            .await?;
        let found = PostgresBookRepository
            .find_by_id(&mut con, &library_id, book.id())
            .await?;
        assert!(found.is_none());
        Ok(())
    }

    #[test_with::env(POSTGRES_TEST)]
    #[tokio::test]
    async fn lock_by_id_blocks_other_lockers() -> error_stack::Result<(), KernelError> {
        let (db, library_id, _) = committed().await?;
        let book = book(&library_id, "locked", 1);
        let mut setup = db.transact().await?;
        PostgresBookRepository.create(&mut setup, &book).await?;
        setup.commit().await?;

        let mut first = db.transact().await?;
        let locked = PostgresBookRepository
            .lock_by_id(&mut first, &library_id, book.id())
            .await?;
        assert_eq!(locked, Some(book.clone()));

        let mut second = db.transact().await?;
        short_lock_timeout(&mut second).await?;
        let blocked = PostgresBookRepository
            .lock_by_id(&mut second, &library_id, book.id())
            .await
            .unwrap_err();
        assert_eq!(blocked.current_context(), &KernelError::Timeout);

        second.roll_back().await?;
        first.roll_back().await?;
        discard(&db, &library_id).await
    }
}
