use std::str::FromStr;

use error_stack::Report;
use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::query::{DependOnUserQuery, UserQuery};
use kernel::interface::update::{DependOnUserModifier, UserModifier};
use kernel::prelude::entity::{Tenant, User, UserEmail, UserId, UserName, UserRole};
use kernel::KernelError;
use uuid::Uuid;

use crate::transfer::{CreateUserDto, GetAllUserDto, GetUserDto, UserDto};

pub(crate) fn require_non_blank(field: &str, value: &str) -> error_stack::Result<(), KernelError> {
    if value.trim().is_empty() {
        Err(Report::new(KernelError::InvalidInput).attach_printable(format!("{field} is required")))
    } else {
        Ok(())
    }
}

#[async_trait::async_trait]
pub trait GetUserService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnUserQuery
{
    async fn get_user(
        &self,
        tenant: &Tenant,
        dto: GetUserDto,
    ) -> error_stack::Result<Option<UserDto>, KernelError> {
        let id = UserId::new(dto.id);
        tenant.require_self_or_admin(&id)?;
        let mut connection = self.database_connection().transact().await?;
        let user = self
            .user_query()
            .find_by_id(&mut connection, tenant.library_id(), &id)
            .await?;
        Ok(user.map(UserDto::from))
    }

    async fn get_users(
        &self,
        tenant: &Tenant,
        dto: GetAllUserDto,
    ) -> error_stack::Result<Vec<UserDto>, KernelError> {
        tenant.require_admin()?;
        let mut connection = self.database_connection().transact().await?;
        let users = self
            .user_query()
            .find_all(&mut connection, tenant.library_id(), &dto.limit, &dto.offset)
            .await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }
}

impl<T> GetUserService for T where T: DependOnDatabaseConnection + DependOnUserQuery {}

#[async_trait::async_trait]
pub trait CreateUserService:
    'static + Sync + Send + DependOnDatabaseConnection + DependOnUserModifier
{
    async fn create_user(
        &self,
        tenant: &Tenant,
        dto: CreateUserDto,
    ) -> error_stack::Result<Uuid, KernelError> {
        tenant.require_admin()?;
        require_non_blank("name", &dto.name)?;
        require_non_blank("email", &dto.email)?;
        let role = UserRole::from_str(&dto.role)?;

        let mut connection = self.database_connection().transact().await?;

        let uuid = Uuid::new_v4();
        let user = User::new(
            UserId::new(uuid),
            tenant.library_id().clone(),
            UserName::new(dto.name),
            UserEmail::new(dto.email),
            role,
        );
        self.user_modifier().create(&mut connection, &user).await?;
        connection.commit().await?;

        Ok(uuid)
    }
}

impl<T> CreateUserService for T where T: DependOnDatabaseConnection + DependOnUserModifier {}
