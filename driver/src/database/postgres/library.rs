use kernel::interface::query::LibraryQuery;
use kernel::interface::update::LibraryModifier;
use kernel::prelude::entity::{Library, LibraryId, LibraryName};
use kernel::KernelError;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::postgres::PostgresTransaction;
use crate::error::ConvertError;

pub struct PostgresLibraryRepository;

#[async_trait::async_trait]
impl LibraryQuery for PostgresLibraryRepository {
    type Transaction = PostgresTransaction;

    async fn find_by_id(
        &self,
        con: &mut PostgresTransaction,
        id: &LibraryId,
    ) -> error_stack::Result<Option<Library>, KernelError> {
        PgLibraryInternal::find_by_id(con, id).await
    }
}

#[async_trait::async_trait]
impl LibraryModifier for PostgresLibraryRepository {
    type Transaction = PostgresTransaction;

    async fn create(
        &self,
        con: &mut PostgresTransaction,
        library: &Library,
    ) -> error_stack::Result<(), KernelError> {
        PgLibraryInternal::create(con, library).await
    }
}

#[derive(sqlx::FromRow)]
struct LibraryRow {
    id: Uuid,
    name: String,
}

impl From<LibraryRow> for Library {
    fn from(value: LibraryRow) -> Self {
        Library::new(LibraryId::new(value.id), LibraryName::new(value.name))
    }
}

pub(in crate::database) struct PgLibraryInternal;

impl PgLibraryInternal {
    async fn find_by_id(
        con: &mut PgConnection,
        id: &LibraryId,
    ) -> error_stack::Result<Option<Library>, KernelError> {
        let row = sqlx::query_as::<_, LibraryRow>(
            // language=postgresql
            r#"
            SELECT id, name
            FROM libraries
            WHERE id = $1
            "#,
        )
        .bind(id.as_ref())
        .fetch_optional(con)
        .await
        .convert_error()?;
        Ok(row.map(Library::from))
    }

    async fn create(
        con: &mut PgConnection,
        library: &Library,
    ) -> error_stack::Result<(), KernelError> {
        // language=postgresql
        sqlx::query(
            r#"
            INSERT INTO libraries (id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(library.id().as_ref())
        .bind(library.name().as_ref())
        .execute(con)
        .await
        .convert_error()?;
        Ok(())
    }
}
