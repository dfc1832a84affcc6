mod author;
mod id;
mod inventory;
mod isbn;
mod title;

pub use self::{author::*, id::*, inventory::*, isbn::*, title::*};
use crate::entity::LibraryId;
use destructure::{Destructure, Mutation};
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct Book {
    id: BookId,
    library_id: LibraryId,
    title: BookTitle,
    author: BookAuthor,
    isbn: BookIsbn,
    inventory: BookInventory,
}

impl Book {
    pub fn new(
        id: BookId,
        library_id: LibraryId,
        title: BookTitle,
        author: BookAuthor,
        isbn: BookIsbn,
        inventory: BookInventory,
    ) -> Self {
        Self {
            id,
            library_id,
            title,
            author,
            isbn,
            inventory,
        }
    }
}
