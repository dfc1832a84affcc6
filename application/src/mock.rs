//! In-memory stand-ins for the driver, used by the service tests.
//!
//! A transaction works on a snapshot of the store and publishes it on commit,
//! so anything written by a failed operation disappears with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use error_stack::Report;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::notify::{DependOnLoanNotifier, LoanNotifier};
use kernel::interface::query::{
    BookQuery, DependOnBookQuery, DependOnLoanQuery, DependOnUserQuery, LoanQuery, UserQuery,
};
use kernel::interface::update::{
    BookModifier, DependOnBookModifier, DependOnInventoryLedger, DependOnLibraryModifier,
    DependOnLoanModifier, DependOnUserModifier, InventoryLedger, LibraryModifier, LoanModifier,
    UserModifier,
};
use kernel::prelude::entity::{
    Book, BookAuthor, BookId, BookInventory, BookIsbn, BookTitle, BorrowedAt, DependOnLoanPolicy,
    DueDate, Library, LibraryId, LibraryName, Loan, LoanId, LoanPolicy, LoanStatus,
    NotificationKind, OverflowPolicy, Restock, SelectLimit, SelectOffset, Tenant, User, UserEmail,
    UserId, UserName, UserRole,
};
use kernel::KernelError;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct State {
    libraries: Vec<Library>,
    users: Vec<User>,
    books: Vec<Book>,
    loans: Vec<Loan>,
    /// Rows taken with `lock_by_id`, in order.
    locks: Vec<Uuid>,
}

impl State {
    fn book_mut(
        &mut self,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<&mut Book, KernelError> {
        self.books
            .iter_mut()
            .find(|book| book.library_id() == library_id && book.id() == id)
            .ok_or_else(|| Report::new(KernelError::NotFound))
    }
}

fn page<T: Clone>(items: impl Iterator<Item = T>, limit: &SelectLimit, offset: &SelectOffset) -> Vec<T> {
    items
        .skip(usize::try_from(*offset.as_ref()).unwrap_or(0))
        .take(usize::try_from(*limit.as_ref()).unwrap_or(0))
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Clone, Default)]
pub struct MockDatabase {
    state: Arc<Mutex<State>>,
}

pub struct MockTransaction {
    shared: Arc<Mutex<State>>,
    working: State,
}

#[async_trait::async_trait]
impl DatabaseConnection for MockDatabase {
    type Transaction = MockTransaction;

    async fn transact(&self) -> error_stack::Result<MockTransaction, KernelError> {
        let working = self.state.lock().unwrap().clone();
        Ok(MockTransaction {
            shared: Arc::clone(&self.state),
            working,
        })
    }
}

#[async_trait::async_trait]
impl Transaction for MockTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        *self.shared.lock().unwrap() = self.working;
        Ok(())
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        Ok(())
    }
}

pub struct MockLibraryRepository;

#[async_trait::async_trait]
impl LibraryModifier for MockLibraryRepository {
    type Transaction = MockTransaction;

    async fn create(
        &self,
        con: &mut MockTransaction,
        library: &Library,
    ) -> error_stack::Result<(), KernelError> {
        con.working.libraries.push(library.clone());
        Ok(())
    }
}

pub struct MockUserRepository;

#[async_trait::async_trait]
impl UserQuery for MockUserRepository {
    type Transaction = MockTransaction;

    async fn find_caller(
        &self,
        con: &mut MockTransaction,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        Ok(con.working.users.iter().find(|user| user.id() == id).cloned())
    }

    async fn find_by_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        Ok(con
            .working
            .users
            .iter()
            .find(|user| user.library_id() == library_id && user.id() == id)
            .cloned())
    }

    async fn lock_by_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        con.working.locks.push(*id.as_ref());
        self.find_by_id(con, library_id, id).await
    }

    async fn find_by_name(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        name: &str,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        Ok(con
            .working
            .users
            .iter()
            .filter(|user| {
                user.library_id() == library_id && contains_ignore_case(user.name().as_ref(), name)
            })
            .cloned()
            .collect())
    }

    async fn find_all(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        Ok(page(
            con.working
                .users
                .iter()
                .filter(|user| user.library_id() == library_id)
                .cloned(),
            limit,
            offset,
        ))
    }
}

#[async_trait::async_trait]
impl UserModifier for MockUserRepository {
    type Transaction = MockTransaction;

    async fn create(
        &self,
        con: &mut MockTransaction,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        con.working.users.push(user.clone());
        Ok(())
    }
}

pub struct MockBookRepository;

#[async_trait::async_trait]
impl BookQuery for MockBookRepository {
    type Transaction = MockTransaction;

    async fn find_by_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        Ok(con
            .working
            .books
            .iter()
            .find(|book| book.library_id() == library_id && book.id() == id)
            .cloned())
    }

    async fn lock_by_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        id: &BookId,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        con.working.locks.push(*id.as_ref());
        self.find_by_id(con, library_id, id).await
    }

    async fn find_by_isbn(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        isbn: &BookIsbn,
    ) -> error_stack::Result<Option<Book>, KernelError> {
        Ok(con
            .working
            .books
            .iter()
            .find(|book| book.library_id() == library_id && book.isbn() == isbn)
            .cloned())
    }

    async fn find_by_title(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        title: &str,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        Ok(con
            .working
            .books
            .iter()
            .filter(|book| {
                book.library_id() == library_id && contains_ignore_case(book.title().as_ref(), title)
            })
            .cloned()
            .collect())
    }

    async fn find_all(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Book>, KernelError> {
        Ok(page(
            con.working
                .books
                .iter()
                .filter(|book| book.library_id() == library_id)
                .cloned(),
            limit,
            offset,
        ))
    }
}

#[async_trait::async_trait]
impl BookModifier for MockBookRepository {
    type Transaction = MockTransaction;

    async fn create(
        &self,
        con: &mut MockTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        con.working.books.push(book.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MockTransaction,
        book: &Book,
    ) -> error_stack::Result<(), KernelError> {
        let stored = con.working.book_mut(book.library_id(), book.id())?;
        stored.substitute(|stored| {
            *stored.title = book.title().clone();
            *stored.author = book.author().clone();
            *stored.isbn = book.isbn().clone();
        });
        Ok(())
    }

    async fn delete(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        con.working
            .books
            .retain(|book| !(book.library_id() == library_id && book.id() == book_id));
        con.working.loans.retain(|loan| loan.book_id() != book_id);
        Ok(())
    }
}

pub struct MockInventoryLedger;

#[async_trait::async_trait]
impl InventoryLedger for MockInventoryLedger {
    type Transaction = MockTransaction;

    async fn decrement(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<(), KernelError> {
        let book = con.working.book_mut(library_id, book_id)?;
        let inventory = book.inventory().checkout()?;
        book.substitute(|book| *book.inventory = inventory);
        Ok(())
    }

    async fn increment(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        policy: &OverflowPolicy,
    ) -> error_stack::Result<Restock, KernelError> {
        let book = con.working.book_mut(library_id, book_id)?;
        let (inventory, restock) = book.inventory().check_in(policy)?;
        book.substitute(|book| *book.inventory = inventory);
        Ok(restock)
    }

    async fn set_stock_and_available(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        inventory: &BookInventory,
    ) -> error_stack::Result<(), KernelError> {
        let book = con.working.book_mut(library_id, book_id)?;
        book.substitute(|book| *book.inventory = *inventory);
        Ok(())
    }
}

pub struct MockLoanRepository;

impl MockLoanRepository {
    fn scoped<'a>(
        con: &'a MockTransaction,
        library_id: &'a LibraryId,
    ) -> impl Iterator<Item = &'a Loan> + 'a {
        con.working
            .loans
            .iter()
            .filter(move |loan| loan.library_id() == library_id)
    }
}

#[async_trait::async_trait]
impl LoanQuery for MockLoanRepository {
    type Transaction = MockTransaction;

    async fn find_by_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        id: &LoanId,
    ) -> error_stack::Result<Option<Loan>, KernelError> {
        Ok(Self::scoped(con, library_id)
            .find(|loan| loan.id() == id)
            .cloned())
    }

    async fn find_all(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        Ok(page(Self::scoped(con, library_id).cloned(), limit, offset))
    }

    async fn find_by_user_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        Ok(Self::scoped(con, library_id)
            .filter(|loan| loan.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_book_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        Ok(Self::scoped(con, library_id)
            .filter(|loan| loan.book_id() == book_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_book(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        Ok(Self::scoped(con, library_id)
            .filter(|loan| {
                loan.user_id() == user_id
                    && loan.book_id() == book_id
                    && statuses.contains(loan.status())
            })
            .cloned()
            .collect())
    }

    async fn count_by_user_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        user_id: &UserId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        Ok(Self::scoped(con, library_id)
            .filter(|loan| loan.user_id() == user_id && statuses.contains(loan.status()))
            .count() as i64)
    }

    async fn count_by_book_id(
        &self,
        con: &mut MockTransaction,
        library_id: &LibraryId,
        book_id: &BookId,
        statuses: &[LoanStatus],
    ) -> error_stack::Result<i64, KernelError> {
        Ok(Self::scoped(con, library_id)
            .filter(|loan| loan.book_id() == book_id && statuses.contains(loan.status()))
            .count() as i64)
    }
}

#[async_trait::async_trait]
impl LoanModifier for MockLoanRepository {
    type Transaction = MockTransaction;

    async fn create(
        &self,
        con: &mut MockTransaction,
        loan: &Loan,
    ) -> error_stack::Result<(), KernelError> {
        con.working.loans.push(loan.clone());
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MockTransaction,
        loan: &Loan,
        expected: &LoanStatus,
    ) -> error_stack::Result<(), KernelError> {
        let stored = con
            .working
            .loans
            .iter_mut()
            .find(|stored| stored.library_id() == loan.library_id() && stored.id() == loan.id())
            .filter(|stored| stored.status() == expected)
            .ok_or_else(|| Report::new(KernelError::Concurrency))?;
        *stored = loan.clone();
        Ok(())
    }

    async fn mark_overdue(
        &self,
        con: &mut MockTransaction,
        now: &OffsetDateTime,
    ) -> error_stack::Result<Vec<Loan>, KernelError> {
        let mut marked = Vec::new();
        for stored in con.working.loans.iter_mut() {
            if stored.status() == &LoanStatus::Active && stored.is_past_due(*now) {
                *stored = stored.clone().mark_overdue(*now)?;
                marked.push(stored.clone());
            }
        }
        Ok(marked)
    }
}

#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<(Uuid, NotificationKind)>>>,
    failing: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl LoanNotifier for MockNotifier {
    async fn notify(
        &self,
        loan_id: &LoanId,
        kind: NotificationKind,
    ) -> error_stack::Result<(), KernelError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Report::new(KernelError::Timeout).attach_printable("mailer is down"));
        }
        self.sent.lock().unwrap().push((*loan_id.as_ref(), kind));
        Ok(())
    }
}

pub struct MockModule {
    database: MockDatabase,
    notifier: MockNotifier,
    policy: LoanPolicy,
}

impl Default for MockModule {
    fn default() -> Self {
        Self::with_overflow(OverflowPolicy::Clamp)
    }
}

impl MockModule {
    pub fn with_overflow(overflow: OverflowPolicy) -> Self {
        let policy = LoanPolicy::default();
        Self {
            database: MockDatabase::default(),
            notifier: MockNotifier::default(),
            policy: LoanPolicy::new(
                *policy.max_outstanding(),
                *policy.loan_duration(),
                *policy.chat_loan_duration(),
                *policy.renew_extension(),
                overflow,
            ),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.database.state.lock().unwrap())
    }

    /// Seeds a library and its administrator, returning the admin's tenant
    /// and the library id.
    pub fn library_with_admin(&self) -> (Tenant, Uuid) {
        let library_id = LibraryId::new(Uuid::new_v4());
        let admin = self.user(&library_id, "Admin", UserRole::Admin);
        self.with_state(|state| {
            state.libraries.push(Library::new(
                library_id.clone(),
                LibraryName::new("Test Library"),
            ))
        });
        (admin, *library_id.as_ref())
    }

    pub fn student(&self, library_id: &Uuid, name: &str) -> Tenant {
        self.user(&LibraryId::new(*library_id), name, UserRole::Student)
    }

    fn user(&self, library_id: &LibraryId, name: &str, role: UserRole) -> Tenant {
        let id = UserId::new(Uuid::new_v4());
        self.with_state(|state| {
            state.users.push(User::new(
                id.clone(),
                library_id.clone(),
                UserName::new(name),
                UserEmail::new(format!("{}@example.com", name.to_lowercase())),
                role,
            ))
        });
        Tenant::new(id, library_id.clone(), role)
    }

    pub fn book(&self, tenant: &Tenant, title: &str, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.with_state(|state| {
            state.books.push(Book::new(
                BookId::new(id),
                tenant.library_id().clone(),
                BookTitle::new(title),
                BookAuthor::new("Anonymous"),
                BookIsbn::new(id.simple().to_string()),
                BookInventory::fully_available(stock).unwrap(),
            ))
        });
        id
    }

    pub fn inventory_of(&self, book_id: Uuid) -> (i32, i32) {
        self.with_state(|state| {
            let book = state
                .books
                .iter()
                .find(|book| book.id().as_ref() == &book_id)
                .unwrap();
            (book.inventory().stock(), book.inventory().available())
        })
    }

    /// Overwrites the counts without going through a service.
    pub fn force_inventory(&self, book_id: Uuid, stock: i32, available: i32) {
        let inventory = BookInventory::new(stock, available).unwrap();
        self.with_state(|state| {
            let book = state
                .books
                .iter_mut()
                .find(|book| book.id().as_ref() == &book_id)
                .unwrap();
            book.substitute(|book| *book.inventory = inventory);
        })
    }

    pub fn active_loan(&self, borrower: &Tenant, book_id: Uuid, due: OffsetDateTime) -> Uuid {
        self.seed_loan(borrower, book_id, LoanStatus::Active, due)
    }

    pub fn overdue_loan(&self, borrower: &Tenant, book_id: Uuid, due: OffsetDateTime) -> Uuid {
        self.seed_loan(borrower, book_id, LoanStatus::Overdue, due)
    }

    fn seed_loan(
        &self,
        borrower: &Tenant,
        book_id: Uuid,
        status: LoanStatus,
        due: OffsetDateTime,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let book_id = BookId::new(book_id);
        self.with_state(|state| {
            let book = state.book_mut(borrower.library_id(), &book_id).unwrap();
            let inventory = book.inventory().checkout().unwrap();
            book.substitute(|book| *book.inventory = inventory);
            state.loans.push(Loan::new(
                LoanId::new(id),
                borrower.library_id().clone(),
                book_id,
                borrower.user_id().clone(),
                status,
                BorrowedAt::new(due - Duration::days(7)),
                DueDate::new(due),
                None,
            ));
        });
        id
    }

    pub fn loan(&self, id: Uuid) -> Loan {
        self.with_state(|state| {
            state
                .loans
                .iter()
                .find(|loan| loan.id().as_ref() == &id)
                .cloned()
                .unwrap()
        })
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.with_state(|state| state.loans.clone())
    }

    /// Ids locked by committed transactions.
    pub fn locked_rows(&self) -> Vec<Uuid> {
        self.with_state(|state| state.locks.clone())
    }

    /// Writes `loan` as if it had been read while the stored status was
    /// `expected`.
    pub async fn replay_update(
        &self,
        loan: Loan,
        expected: LoanStatus,
    ) -> error_stack::Result<(), KernelError> {
        let mut connection = self.database.transact().await?;
        MockLoanRepository
            .update(&mut connection, &loan, &expected)
            .await?;
        connection.commit().await
    }

    pub fn notifications(&self) -> Vec<(Uuid, NotificationKind)> {
        self.notifier.sent.lock().unwrap().clone()
    }

    pub fn fail_notifications(&self) {
        self.notifier.failing.store(true, Ordering::SeqCst);
    }
}

impl DependOnDatabaseConnection for MockModule {
    type DatabaseConnection = MockDatabase;
    fn database_connection(&self) -> &MockDatabase {
        &self.database
    }
}

impl DependOnLibraryModifier for MockModule {
    type LibraryModifier = MockLibraryRepository;
    fn library_modifier(&self) -> &MockLibraryRepository {
        &MockLibraryRepository
    }
}

impl DependOnUserQuery for MockModule {
    type UserQuery = MockUserRepository;
    fn user_query(&self) -> &MockUserRepository {
        &MockUserRepository
    }
}

impl DependOnUserModifier for MockModule {
    type UserModifier = MockUserRepository;
    fn user_modifier(&self) -> &MockUserRepository {
        &MockUserRepository
    }
}

impl DependOnBookQuery for MockModule {
    type BookQuery = MockBookRepository;
    fn book_query(&self) -> &MockBookRepository {
        &MockBookRepository
    }
}

impl DependOnBookModifier for MockModule {
    type BookModifier = MockBookRepository;
    fn book_modifier(&self) -> &MockBookRepository {
        &MockBookRepository
    }
}

impl DependOnInventoryLedger for MockModule {
    type InventoryLedger = MockInventoryLedger;
    fn inventory_ledger(&self) -> &MockInventoryLedger {
        &MockInventoryLedger
    }
}

impl DependOnLoanQuery for MockModule {
    type LoanQuery = MockLoanRepository;
    fn loan_query(&self) -> &MockLoanRepository {
        &MockLoanRepository
    }
}

impl DependOnLoanModifier for MockModule {
    type LoanModifier = MockLoanRepository;
    fn loan_modifier(&self) -> &MockLoanRepository {
        &MockLoanRepository
    }
}

impl DependOnLoanNotifier for MockModule {
    type LoanNotifier = MockNotifier;
    fn loan_notifier(&self) -> &MockNotifier {
        &self.notifier
    }
}

impl DependOnLoanPolicy for MockModule {
    fn loan_policy(&self) -> &LoanPolicy {
        &self.policy
    }
}
