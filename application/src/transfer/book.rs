use kernel::prelude::entity::{Book, DestructBook, SelectLimit, SelectOffset};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BookDto {
    pub id: Uuid,
    pub library_id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub stock: i32,
    pub available: i32,
}

impl From<Book> for BookDto {
    fn from(value: Book) -> Self {
        let DestructBook {
            id,
            library_id,
            title,
            author,
            isbn,
            inventory,
        } = value.into_destruct();
        Self {
            id: id.into(),
            library_id: library_id.into(),
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            stock: inventory.stock(),
            available: inventory.available(),
        }
    }
}

pub struct GetBookDto {
    pub id: Uuid,
}

pub struct GetAllBookDto {
    pub limit: SelectLimit,
    pub offset: SelectOffset,
}

pub struct BrowseCatalogDto {
    pub library_id: Uuid,
    pub limit: SelectLimit,
    pub offset: SelectOffset,
}

pub struct CreateBookDto {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub stock: i32,
}

pub struct UpdateBookDto {
    pub id: Uuid,
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

pub struct SetInventoryDto {
    pub id: Uuid,
    pub stock: i32,
    pub available: i32,
}

pub struct DeleteBookDto {
    pub id: Uuid,
}
