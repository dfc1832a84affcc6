use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{Book, BookId, BookIsbn, LibraryId, SelectLimit, SelectOffset};
use crate::KernelError;

#[async_trait::async_trait]
pub trait BookQuery: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError>;

    /// Same as [`BookQuery::find_by_id`], holding the row until the
    /// transaction ends.
    async fn lock_by_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError>;

    async fn find_by_isbn(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        isbn: &BookIsbn,
    ) -> error_stack::Result<Option<Book>, KernelError>;

    /// Case-insensitive substring match on the title.
    async fn find_by_title(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        title: &str,
    ) -> error_stack::Result<Vec<Book>, KernelError>;

    async fn find_all(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Book>, KernelError>;
}

pub trait DependOnBookQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type BookQuery: BookQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn book_query(&self) -> &Self::BookQuery;
}
