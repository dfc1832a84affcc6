use uuid::Uuid;

pub struct RegisterLibraryDto {
    pub library_name: String,
    pub admin_name: String,
    pub admin_email: String,
}

#[derive(Debug, Clone)]
pub struct RegisteredLibraryDto {
    pub library_id: Uuid,
    pub admin_id: Uuid,
}
