use kernel::interface::database::{DatabaseConnection, DependOnDatabaseConnection, Transaction};
use kernel::interface::update::{
    DependOnLibraryModifier, DependOnUserModifier, LibraryModifier, UserModifier,
};
use kernel::prelude::entity::{
    Library, LibraryId, LibraryName, User, UserEmail, UserId, UserName, UserRole,
};
use kernel::KernelError;
use uuid::Uuid;

use crate::service::user::require_non_blank;
use crate::transfer::{RegisterLibraryDto, RegisteredLibraryDto};

#[async_trait::async_trait]
pub trait RegisterLibraryService:
    'static
    + Sync
    + Send
    + DependOnDatabaseConnection
    + DependOnLibraryModifier
    + DependOnUserModifier
{
    /// Creates a library together with its first administrator.
    async fn register_library(
        &self,
        dto: RegisterLibraryDto,
    ) -> error_stack::Result<RegisteredLibraryDto, KernelError> {
        require_non_blank("library name", &dto.library_name)?;
        require_non_blank("admin name", &dto.admin_name)?;
        require_non_blank("admin email", &dto.admin_email)?;

        let mut connection = self.database_connection().transact().await?;

        let library_id = Uuid::new_v4();
        let library = Library::new(
            LibraryId::new(library_id),
            LibraryName::new(dto.library_name),
        );
        self.library_modifier()
            .create(&mut connection, &library)
            .await?;

        let admin_id = Uuid::new_v4();
        let admin = User::new(
            UserId::new(admin_id),
            LibraryId::new(library_id),
            UserName::new(dto.admin_name),
            UserEmail::new(dto.admin_email),
            UserRole::Admin,
        );
        self.user_modifier().create(&mut connection, &admin).await?;

        connection.commit().await?;
        tracing::info!(%library_id, %admin_id, "library registered");

        Ok(RegisteredLibraryDto {
            library_id,
            admin_id,
        })
    }
}

impl<T> RegisterLibraryService for T where
    T: DependOnDatabaseConnection + DependOnLibraryModifier + DependOnUserModifier
{
}
