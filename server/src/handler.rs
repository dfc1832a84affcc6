use driver::database::{
    PostgresBookRepository, PostgresDatabase, PostgresInventoryLedger, PostgresLibraryRepository,
    PostgresLoanRepository, PostgresUserRepository, RedisDatabase, RedisLoanNotifier,
};
use kernel::interface::database::DependOnDatabaseConnection;
use kernel::interface::notify::DependOnLoanNotifier;
use kernel::interface::query::{
    DependOnBookQuery, DependOnLibraryQuery, DependOnLoanQuery, DependOnUserQuery,
};
use kernel::interface::update::{
    DependOnBookModifier, DependOnInventoryLedger, DependOnLibraryModifier, DependOnLoanModifier,
    DependOnUserModifier,
};
use kernel::prelude::entity::{DependOnLoanPolicy, LoanPolicy};
use kernel::KernelError;
use std::ops::Deref;
use std::sync::Arc;
use vodca::References;

#[derive(Clone)]
pub struct AppModule(Arc<Handler>);

impl AppModule {
    pub async fn new(policy: LoanPolicy) -> error_stack::Result<Self, KernelError> {
        Ok(Self(Arc::new(Handler::init(policy).await?)))
    }
}

impl Deref for AppModule {
    type Target = Handler;
    fn deref(&self) -> &Self::Target {
        Deref::deref(&self.0)
    }
}

#[derive(References)]
pub struct Handler {
    pgpool: PostgresDatabase,
    notifier: RedisLoanNotifier,
    policy: LoanPolicy,
}

impl Handler {
    pub async fn init(policy: LoanPolicy) -> error_stack::Result<Self, KernelError> {
        let pgpool = PostgresDatabase::new().await?;
        pgpool.migrate().await?;
        let redis = RedisDatabase::new()?;
        let notifier = RedisLoanNotifier::new(redis);

        Ok(Self {
            pgpool,
            notifier,
            policy,
        })
    }
}

impl DependOnDatabaseConnection for Handler {
    type DatabaseConnection = PostgresDatabase;
    fn database_connection(&self) -> &Self::DatabaseConnection {
        self.pgpool()
    }
}

impl DependOnLibraryQuery for Handler {
    type LibraryQuery = PostgresLibraryRepository;
    fn library_query(&self) -> &Self::LibraryQuery {
        &PostgresLibraryRepository
    }
}

impl DependOnLibraryModifier for Handler {
    type LibraryModifier = PostgresLibraryRepository;
    fn library_modifier(&self) -> &Self::LibraryModifier {
        &PostgresLibraryRepository
    }
}

impl DependOnUserQuery for Handler {
    type UserQuery = PostgresUserRepository;
    fn user_query(&self) -> &Self::UserQuery {
        &PostgresUserRepository
    }
}

impl DependOnUserModifier for Handler {
    type UserModifier = PostgresUserRepository;
    fn user_modifier(&self) -> &Self::UserModifier {
        &PostgresUserRepository
    }
}

impl DependOnBookQuery for Handler {
    type BookQuery = PostgresBookRepository;
    fn book_query(&self) -> &Self::BookQuery {
        &PostgresBookRepository
    }
}

impl DependOnBookModifier for Handler {
    type BookModifier = PostgresBookRepository;
    fn book_modifier(&self) -> &Self::BookModifier {
        &PostgresBookRepository
    }
}

impl DependOnInventoryLedger for Handler {
    type InventoryLedger = PostgresInventoryLedger;
    fn inventory_ledger(&self) -> &Self::InventoryLedger {
        &PostgresInventoryLedger
    }
}

impl DependOnLoanQuery for Handler {
    type LoanQuery = PostgresLoanRepository;
    fn loan_query(&self) -> &Self::LoanQuery {
        &PostgresLoanRepository
    }
}

impl DependOnLoanModifier for Handler {
    type LoanModifier = PostgresLoanRepository;
    fn loan_modifier(&self) -> &Self::LoanModifier {
        &PostgresLoanRepository
    }
}

impl DependOnLoanNotifier for Handler {
    type LoanNotifier = RedisLoanNotifier;
    fn loan_notifier(&self) -> &Self::LoanNotifier {
        self.notifier()
    }
}

impl DependOnLoanPolicy for Handler {
    fn loan_policy(&self) -> &LoanPolicy {
        self.policy()
    }
}
