use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::Library;
use crate::KernelError;

#[async_trait::async_trait]
pub trait LibraryModifier: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn create(
        &self,
        con: &mut Self::Transaction,
        library: &Library,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnLibraryModifier: 'static + Sync + Send + DependOnDatabaseConnection {
    type LibraryModifier: LibraryModifier<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn library_modifier(&self) -> &Self::LibraryModifier;
}
