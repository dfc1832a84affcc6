mod book;
mod ledger;
mod library;
mod loan;
mod user;

pub use self::{book::*, ledger::*, library::*, loan::*, user::*};
use crate::env;
use crate::error::ConvertError;
use error_stack::{Report, ResultExt};
use kernel::interface::database::{DatabaseConnection, Transaction};
use kernel::KernelError;
use sqlx::{Error, PgConnection, Pool, Postgres};
use std::ops::{Deref, DerefMut};

static POSTGRES_URL: &str = "POSTGRES_URL";

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<Postgres>,
}

impl PostgresDatabase {
    pub async fn new() -> error_stack::Result<Self, KernelError> {
        let url = env(POSTGRES_URL)?;
        let pool = Pool::connect(&url).await.convert_error()?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> error_stack::Result<(), KernelError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .change_context_lazy(|| KernelError::Internal)
            .attach_printable("Failed to apply migrations")
    }
}

#[async_trait::async_trait]
impl DatabaseConnection for PostgresDatabase {
    type Transaction = PostgresTransaction;
    async fn transact(&self) -> error_stack::Result<Self::Transaction, KernelError> {
        let transaction = self.pool.begin().await.convert_error()?;
        Ok(PostgresTransaction(transaction))
    }
}

pub struct PostgresTransaction(sqlx::Transaction<'static, Postgres>);

#[async_trait::async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self) -> error_stack::Result<(), KernelError> {
        self.0.commit().await.convert_error()
    }

    async fn roll_back(self) -> error_stack::Result<(), KernelError> {
        self.0.rollback().await.convert_error()
    }
}

impl Deref for PostgresTransaction {
    type Target = PgConnection;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PostgresTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: 'static> ConvertError for Result<T, Error> {
    type Ok = T;
    fn convert_error(self) -> error_stack::Result<T, KernelError> {
        self.map_err(|error| {
            let context = match &error {
                Error::PoolTimedOut => KernelError::Timeout,
                Error::Database(db) if db.is_unique_violation() || db.is_check_violation() => {
                    KernelError::InvalidInput
                }
                // lock_not_available, raised once `lock_timeout` expires
                Error::Database(db) if db.code().as_deref() == Some("55P03") => {
                    KernelError::Timeout
                }
                _ => KernelError::Internal,
            };
            Report::from(error).change_context(context)
        })
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub(in crate::database) fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
pub(in crate::database) mod test {
    use kernel::interface::database::{DatabaseConnection, Transaction};
    use kernel::interface::update::{LibraryModifier, UserModifier};
    use kernel::prelude::entity::{
        Library, LibraryId, LibraryName, User, UserEmail, UserId, UserName, UserRole,
    };
    use kernel::KernelError;
    use uuid::Uuid;

    use crate::database::postgres::like_pattern;
    use crate::database::{
        PostgresDatabase, PostgresLibraryRepository, PostgresTransaction, PostgresUserRepository,
    };
    use crate::error::ConvertError;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("dune"), "%dune%");
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }

    async fn seed(
        con: &mut PostgresTransaction,
    ) -> error_stack::Result<(LibraryId, User), KernelError> {
        let library_id = LibraryId::new(Uuid::new_v4());
        PostgresLibraryRepository
            .create(con, &Library::new(library_id.clone(), LibraryName::new("test")))
            .await?;
        let user = User::new(
            UserId::new(Uuid::new_v4()),
            library_id.clone(),
            UserName::new("Test User"),
            UserEmail::new("test@example.com"),
            UserRole::Student,
        );
        PostgresUserRepository.create(con, &user).await?;
        Ok((library_id, user))
    }

    /// Opens a transaction with a fresh library and one member. Tests never
    /// commit, so nothing outlives them.
    pub async fn seeded() -> error_stack::Result<(PostgresTransaction, LibraryId, User), KernelError>
    {
        let db = PostgresDatabase::new().await?;
        db.migrate().await?;
        let mut con = db.transact().await?;
        let (library_id, user) = seed(&mut con).await?;
        Ok((con, library_id, user))
    }

    /// Like [`seeded`] but committed, for tests that need a second
    /// transaction to see the rows. Pair with [`discard`].
    pub async fn committed() -> error_stack::Result<(PostgresDatabase, LibraryId, User), KernelError>
    {
        let db = PostgresDatabase::new().await?;
        db.migrate().await?;
        let mut con = db.transact().await?;
        let (library_id, user) = seed(&mut con).await?;
        con.commit().await?;
        Ok((db, library_id, user))
    }

    pub async fn discard(
        db: &PostgresDatabase,
        library_id: &LibraryId,
    ) -> error_stack::Result<(), KernelError> {
        let mut con = db.transact().await?;
        // language=postgresql
        sqlx::query("DELETE FROM libraries WHERE id = $1")
            .bind(library_id.as_ref())
            .execute(&mut *con)
            .await
            .convert_error()?;
        con.commit().await
    }

    /// Makes row lock waits in `con` fail fast instead of blocking.
    pub async fn short_lock_timeout(
        con: &mut PostgresTransaction,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query("SET LOCAL lock_timeout = '200ms'")
            .execute(&mut **con)
            .await
            .convert_error()?;
        Ok(())
    }
}
