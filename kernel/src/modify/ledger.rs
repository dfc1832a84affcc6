use crate::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use crate::entity::{BookId, BookInventory, LibraryId, OverflowPolicy, Restock};
use crate::KernelError;

/// Owner of the `0 <= available <= stock` invariant.
///
/// Implementations must make each adjustment a single compare-and-adjust step
/// against the store: the check and the write cannot be separated by another
/// writer, otherwise two borrowers can both take the last copy.
#[async_trait::async_trait]
pub trait InventoryLedger: 'static + Sync + Send {
    type Transaction: Transaction;

    /// Fails with `Unavailable` when no copy is left and `NotFound` when the
    /// book is not in this library. Nothing is written on failure.
    async fn decrement(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError>;

    async fn increment(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        book_id: &BookId,
        policy: &OverflowPolicy,
    ) -> error_stack::Result<Restock, KernelError>;

    /// The only operation allowed to change `stock`.
    async fn set_stock_and_available(
        &self,
        con: &mut Self::Transaction,
        library_id: &LibraryId,
        book_id: &BookId,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnInventoryLedger: 'static + Sync + Send + DependOnDatabaseConnection {
    type InventoryLedger: InventoryLedger<
        Transaction = <Self::DatabaseConnection as DatabaseConnection>::Transaction,
    >;
    fn inventory_ledger(&self) -> &Self::InventoryLedger;
}
