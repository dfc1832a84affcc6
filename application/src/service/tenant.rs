use error_stack::Report;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection};
use kernel::interface::query::{DependOnUserQuery, UserQuery};
use kernel::prelude::entity::{DestructUser, Tenant, UserId};
use kernel::KernelError;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait ResolveTenantService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnUserQuery
{
    /// Binds an authenticated user id to the library it belongs to.
    async fn resolve_tenant(&self, user_id: Uuid) -> error_stack::Result<Tenant, KernelError> {
        let mut connection = self.database_connection().transact().await?;
        let user = self
            .user_query()
            .find_caller(&mut connection, &UserId::new(user_id))
            .await?
            .ok_or_else(|| {
                Report::new(KernelError::PermissionDenied)
                    .attach_printable(format!("unknown caller {user_id}"))
            })?;
        let DestructUser {
            id,
            library_id,
            role,
            ..
        } = user.into_destruct();
        Ok(Tenant::new(id, library_id, role))
    }
}

impl<T> ResolveTenantService for T where T: DependOnDatabaseConnection + DependOnUserQuery {}
