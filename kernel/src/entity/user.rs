mod email;
mod id;
mod name;
mod role;

pub use self::{email::*, id::*, name::*, role::*};
use crate::entity::LibraryId;
use destructure::Destructure;
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, Destructure, References)]
pub struct User {
    id: UserId,
    library_id: LibraryId,
    name: UserName,
    email: UserEmail,
    role: UserRole,
}

impl User {
    pub fn new(
        id: UserId,
        library_id: LibraryId,
        name: UserName,
        email: UserEmail,
        role: UserRole,
    ) -> Self {
        Self {
            id,
            library_id,
            name,
            email,
            role,
        }
    }
}
