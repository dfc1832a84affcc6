use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{Library, LibraryId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait LibraryQuery: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        id: &LibraryId,
    ) -> error_stack::Result<Option<Library>, KernelError>;
}

pub trait DependOnLibraryQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type LibraryQuery: LibraryQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn library_query(&self) -> &Self::LibraryQuery;
}
