use error_stack::Report;
use vodca::References;

use crate::entity::{LibraryId, UserId, UserRole};
use crate::KernelError;

/// Request-scoped capability bound to the caller's library.
///
/// Every query and modification takes the library id carried here, so a row
/// belonging to another library can never be read or written through it.
#[derive(Debug, Clone, Eq, PartialEq, References)]
pub struct Tenant {
    user_id: UserId,
    library_id: LibraryId,
    role: UserRole,
}

impl Tenant {
    pub fn new(user_id: UserId, library_id: LibraryId, role: UserRole) -> Self {
        Self {
            user_id,
            library_id,
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> error_stack::Result<(), KernelError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Report::new(KernelError::PermissionDenied)
                .attach_printable("This operation is restricted to library staff"))
        }
    }

    /// Staff may act on anyone in the library, students only on themselves.
    pub fn require_self_or_admin(&self, user_id: &UserId) -> error_stack::Result<(), KernelError> {
        if self.is_admin() || &self.user_id == user_id {
            Ok(())
        } else {
            Err(Report::new(KernelError::PermissionDenied)
                .attach_printable("Students may only act on their own loans"))
        }
    }
}
