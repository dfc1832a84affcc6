use error_stack::Report;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{BookQuery, DependOnBookQuery, DependOnLoanQuery, LoanQuery};
use kernel::interface::update::{
    BookModifier, DependOnBookModifier, DependOnInventoryLedger, InventoryLedger,
};
use kernel::prelude::entity::{
    Book, BookAuthor, BookId, BookInventory, BookIsbn, BookTitle, LibraryId, LoanStatus, Tenant,
};
use kernel::KernelError;
use uuid::Uuid;

use crate::service::user::require_non_blank;
use crate::transfer::{
    BookDto, BrowseCatalogDto, CreateBookDto, DeleteBookDto, GetAllBookDto, GetBookDto,
    SetInventoryDto, UpdateBookDto,
};

fn book_not_found(id: &BookId) -> Report<KernelError> {
    Report::new(KernelError::NotFound).attach_printable(format!("book {} not found", id.as_ref()))
}

#[async_trait::async_trait]
pub trait GetBookService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnBookQuery
{
    async fn get_book(
        &self,
        tenant: &Tenant,
        dto: GetBookDto,
    ) -> error_stack::Result<Option<BookDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let book = self
            .book_query()
            .find_by_id(&mut connection, tenant.library_id(), &BookId::new(dto.id))
            .await?;
        Ok(book.map(BookDto::from))
    }

    async fn get_books(
        &self,
        tenant: &Tenant,
        dto: GetAllBookDto,
    ) -> error_stack::Result<Vec<BookDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let books = self
            .book_query()
            .find_all(&mut connection, tenant.library_id(), &dto.limit, &dto.offset)
            .await?;
        Ok(books.into_iter().map(BookDto::from).collect())
    }

    /// Public catalog page; no caller identity involved.
    async fn browse_catalog(
        &self,
        dto: BrowseCatalogDto,
    ) -> error_stack::Result<Vec<BookDto>, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let books = self
            .book_query()
            .find_all(
                &mut connection,
                &LibraryId::new(dto.library_id),
                &dto.limit,
                &dto.offset,
            )
            .await?;
        Ok(books.into_iter().map(BookDto::from).collect())
    }
}

impl<T> GetBookService for T where T: DependOnDatabaseConnection + DependOnBookQuery {}

#[async_trait::async_trait]
pub trait CreateBookService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnBookQuery + DependOnBookModifier
{
    async fn create_book(
        &self,
        tenant: &Tenant,
        dto: CreateBookDto,
    ) -> error_stack::Result<Uuid, KernelError> {
        tenant.require_admin()?;
        require_non_blank("title", &dto.title)?;
        require_non_blank("isbn", &dto.isbn)?;
        let inventory = BookInventory::fully_available(dto.stock)?;
        let isbn = BookIsbn::new(dto.isbn);

        let mut connection = self.database_connection().transact().await?;
        if self
            .book_query()
            .find_by_isbn(&mut connection, tenant.library_id(), &isbn)
            .await?
            .is_some()
        {
            return Err(Report::new(KernelError::InvalidInput)
                .attach_printable(format!("isbn {} is already registered", isbn.as_ref())));
        }

        let uuid = Uuid::new_v4();
        let book = Book::new(
            BookId::new(uuid),
            tenant.library_id().clone(),
            BookTitle::new(dto.title),
            BookAuthor::new(dto.author),
            isbn,
            inventory,
        );
        self.book_modifier().create(&mut connection, &book).await?;
        connection.commit().await?;

        Ok(uuid)
    }
}

impl<T> CreateBookService for T where
    T: DependOnDatabaseConnection + DependOnBookQuery + DependOnBookModifier
{
}

#[async_trait::async_trait]
pub trait UpdateBookService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnBookQuery + DependOnBookModifier
{
    async fn update_book(
        &self,
        tenant: &Tenant,
        dto: UpdateBookDto,
    ) -> error_stack::Result<BookDto, KernelError> {
        tenant.require_admin()?;
        let id = BookId::new(dto.id);
        let mut connection = self.database_connection().transact().await?;

        let book = self
            .book_query()
            .find_by_id(&mut connection, tenant.library_id(), &id)
            .await?
            .ok_or_else(|| book_not_found(&id))?;

        if let Some(isbn) = dto.isbn.as_deref() {
            require_non_blank("isbn", isbn)?;
            let isbn = BookIsbn::new(isbn);
            let taken = self
                .book_query()
                .find_by_isbn(&mut connection, tenant.library_id(), &isbn)
                .await?
                .is_some_and(|other| other.id() != &id);
            if taken {
                return Err(Report::new(KernelError::InvalidInput)
                    .attach_printable(format!("isbn {} is already registered", isbn.as_ref())));
            }
        }
        if let Some(title) = dto.title.as_deref() {
            require_non_blank("title", title)?;
        }

        let book = book.reconstruct(|book| {
            if let Some(title) = dto.title {
                book.title = BookTitle::new(title);
            }
            if let Some(author) = dto.author {
                book.author = BookAuthor::new(author);
            }
            if let Some(isbn) = dto.isbn {
                book.isbn = BookIsbn::new(isbn);
            }
        });
        self.book_modifier().update(&mut connection, &book).await?;
        connection.commit().await?;

        Ok(BookDto::from(book))
    }
}

impl<T> UpdateBookService for T where
    T: DependOnDatabaseConnection + DependOnBookQuery + DependOnBookModifier
{
}

#[async_trait::async_trait]
pub trait SetBookInventoryService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnInventoryLedger
{
    /// Direct staff edit of both counts.
    async fn set_book_inventory(
        &self,
        tenant: &Tenant,
        dto: SetInventoryDto,
    ) -> error_stack::Result<(), KernelError> {
        tenant.require_admin()?;
        let inventory = BookInventory::new(dto.stock, dto.available)?;
        let id = BookId::new(dto.id);

        let mut connection = self.database_connection().transact().await?;
        self.inventory_ledger()
            .set_stock_and_available(&mut connection, tenant.library_id(), &id, &inventory)
            .await?;
        connection.commit().await?;

        tracing::info!(book_id = %dto.id, stock = dto.stock, available = dto.available, "inventory set");
        Ok(())
    }
}

impl<T> SetBookInventoryService for T where
    T: DependOnDatabaseConnection + DependOnInventoryLedger
{
}

#[async_trait::async_trait]
pub trait DeleteBookService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnBookQuery
    + DependOnBookModifier
    + DependOnLoanQuery
{
    async fn delete_book(
        &self,
        tenant: &Tenant,
        dto: DeleteBookDto,
    ) -> error_stack::Result<(), KernelError> {
        tenant.require_admin()?;
        let id = BookId::new(dto.id);
        let mut connection = self.database_connection().transact().await?;

        self.book_query()
            .lock_by_id(&mut connection, tenant.library_id(), &id)
            .await?
            .ok_or_else(|| book_not_found(&id))?;

        // Loan rows keep the book as history, so any of them blocks the delete.
        let loans = self
            .loan_query()
            .count_by_book_id(&mut connection, tenant.library_id(), &id, &LoanStatus::ALL)
            .await?;
        if loans > 0 {
            return Err(Report::new(KernelError::HasActiveLoans)
                .attach_printable(format!("book is referenced by {loans} loan records")));
        }

        self.book_modifier()
            .delete(&mut connection, tenant.library_id(), &id)
            .await?;
        connection.commit().await?;

        Ok(())
    }
}

impl<T> DeleteBookService for T where
    T: DependOnDatabaseConnection + DependOnBookQuery + DependOnBookModifier + DependOnLoanQuery
{
}
