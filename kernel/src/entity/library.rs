mod id;
mod name;

pub use self::{id::*, name::*};
use destructure::Destructure;
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure)]
pub struct Library {
    id: LibraryId,
    name: LibraryName,
}

impl Library {
    pub fn new(id: LibraryId, name: LibraryName) -> Self {
        Self { id, name }
    }
}
