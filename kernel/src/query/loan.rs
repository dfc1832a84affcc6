use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{
    BookId, LibraryId, Loan, LoanId, LoanStatus, SelectLimit, SelectOffset, UserId,
};
use crate::KernelError;

#[async_trait::async_trait]
pub trait LoanQuery: 'static + Sync + Send {
    type Transaction: Transaction;
    async fn find_by_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError>;

    async fn find_all(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Loan>, KernelError>;

    async fn find_by_user_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError>;

    async fn find_by_book_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Loan>, KernelError>;

    async fn find_by_user_and_book(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        user_id: &UserId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<Vec<Loan>, KernelError>;

    async fn count_by_user_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        user_id: &UserId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError>;

    async fn count_by_book_id(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError>;
}

pub trait DependOnLoanQuery: 'static + Sync + Send + DependOnDatabaseConnection {
    type LoanQuery: LoanQuery<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn loan_query(&self) -> &Self::LoanQuery;
}
