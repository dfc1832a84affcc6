use kernel::prelude::entity::{DestructUser, SelectLimit, SelectOffset, User};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct UserDto {
    pub id: Uuid,
    pub library_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        let DestructUser {
            id,
            library_id,
            name,
            email,
            role,
        } = value.into_destruct();
        Self {
            id: id.into(),
            library_id: library_id.into(),
            name: name.into(),
            email: email.into(),
            role: role.to_string(),
        }
    }
}

pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub role: String,
}

pub struct GetUserDto {
    pub id: Uuid,
}

pub struct GetAllUserDto {
    pub limit: SelectLimit,
    pub offset: SelectOffset,
}
