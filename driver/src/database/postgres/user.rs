use std::str::FromStr;

use error_stack::Report;
use kernel::interface::query::UserQuery;
use kernel::interface::update::UserModifier;
use kernel::prelude::entity::{
    LibraryId, SelectLimit, SelectOffset, User, UserEmail, UserId, UserName, UserRole,
};
use kernel::KernelError;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::postgres::{like_pattern, PostgresTransaction};
use crate::error::ConvertError;

pub struct PostgresUserRepository;

#[async_trait::async_trait]
impl UserQuery for PostgresUserRepository {
    type Transaction = PostgresTransaction;

    async fn find_caller(
        &self,
        con: &mut PostgresTransaction,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        PgUserInternal::find_caller(con, id).await
    }

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        PgUserInternal::find_by_id(con, library_id, id).await
    }

    async fn lock_by_id(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        PgUserInternal::lock_by_id(con, library_id, id).await
    }

    async fn find_by_name(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        name: &str,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        PgUserInternal::find_by_name(con, library_id, name).await
    }

    async fn find_all(
        &self,
        con: &mut PostgresTransaction,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        PgUserInternal::find_all(con, library_id, limit, offset).await
    }
}

#[async_trait::async_trait]
impl UserModifier for PostgresUserRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        PgUserInternal::create(con, user).await
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    library_id: Uuid,
    name: String,
    email: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = Report<KernelError>;
    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        Ok(User::new(
            UserId::new(value.id),
            LibraryId::new(value.library_id),
            UserName::new(value.name),
            UserEmail::new(value.email),
            UserRole::from_str(&value.role)?,
        ))
    }
}

pub(in crate::database) struct PgUserInternal;

impl PgUserInternal {
    async fn find_caller(
        con: &mut PgConnection,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        let row = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, name, email, role
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        let row = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, name, email, role
            FROM users
            WHERE id = $1 AND library_id = $2
            "#,
        )
        .bind(id.as_ref())
        .bind(library_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(User::try_from).transpose()
    }

    async fn lock_by_id(
        con: &mut PgConnection,
        library_id: &LibraryId,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        let row = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, name, email, role
            FROM users
            WHERE id = $1 AND library_id = $2
            FOR UPDATE
            "#,
        )
        .bind(id.as_ref())
        .bind(library_id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_name(
        con: &mut PgConnection,
        library_id: &LibraryId,
        name: &str,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        let rows = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, name, email, role
            FROM users
            WHERE library_id = $1 AND name ILIKE $2
            ORDER BY name
            "#,
        )
        .bind(library_id.as_ref())
        .bind(like_pattern(name))
        .fetch_all(con)
        .await
        .convert_error()?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn find_all(
        con: &mut PgConnection,
        library_id: &LibraryId,
        limit: &SelectLimit,
        offset: &SelectOffset,
    ) -> error_stack::Result<Vec<User>, KernelError> {
        let rows = sqlx::query_as::<_, UserRow>(
            // language=postgresql
            r#"
            SELECT id, library_id, name, email, role
            FROM users
            WHERE library_id = $1
            ORDER BY name, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(library_id.as_ref())
        .bind(limit.as_ref())
        .bind(offset.as_ref())
        .fetch_all(con)
        .await
        .convert_error()?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn create(con: &mut PgConnection, user: &User) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO users (id, library_id, name, email, role)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id().as_ref())
        .bind(user.library_id().as_ref())
        .bind(user.name().as_ref())
        .bind(user.email().as_ref())
        .bind(user.role().as_str())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }
}
