use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{LibraryId, SelectLimit, SelectOffset, User, UserId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait UserQuery: 'static + Sync + Send {
    type Transaction: Transaction;
    /// Unscoped lookup used only to resolve the caller into a tenant.
    async fn find_caller(
        &self,
        con: &mut Self::Transaction,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError>;

    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError>;

    /// Row-locking lookup. Loan creation takes it so that concurrent
    /// requests from one user are counted one at a time.
    async fn lock_by_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError>;

    /// Case-insensitive substring match on the name.
    async fn find_by_name(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        name: &str,
    ) -> error_stack::Result<Vec<User>, KernelError>;

    async fn find_all(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<User>, KernelError>;
}

pub trait DependOnUserQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type UserQuery: UserQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn user_query(&self) -> &Self::UserQuery;
}
