use crate::controller::{Intake, TryIntake};
use application::transfer::{
    BrowseCatalogDto, CreateBookDto, DeleteBookDto, GetAllBookDto, GetBookDto, SetInventoryDto,
    UpdateBookDto,
};
use error_stack::Report;
use kernel::prelude::entity::{SelectLimit, SelectOffset};
use kernel::KernelError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    title: String,
    #[serde(default)]
    author: String,
    isbn: String,
    stock: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    title: Option<String>,
    author: Option<String>,
    isbn: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InventoryRequest {
    stock: i32,
    available: i32,
}

#[derive(Debug)]
pub struct DeleteRequest {
    id: Uuid,
}

impl DeleteRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug, Deserialize)]
pub struct GetAllRequest {
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default)]
    offset: Option<i64>,
}

#[derive(Debug)]
pub struct GetRequest {
    id: Uuid,
}

impl GetRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

pub struct Transformer;

impl Intake<CreateRequest> for Transformer {
    type To = CreateBookDto;
    fn emit(&self, input: CreateRequest) -> Self::To {
        CreateBookDto {
            title: input.title,
            author: input.author,
            isbn: input.isbn,
            stock: input.stock,
        }
    }
}

impl Intake<(Uuid, UpdateRequest)> for Transformer {
    type To = UpdateBookDto;
    fn emit(&self, input: (Uuid, UpdateRequest)) -> Self::To {
        let (id, input) = input;
        UpdateBookDto {
            id,
            title: input.title,
            author: input.author,
            isbn: input.isbn,
        }
    }
}

impl Intake<(Uuid, InventoryRequest)> for Transformer {
    type To = SetInventoryDto;
    fn emit(&self, input: (Uuid, InventoryRequest)) -> Self::To {
        let (id, input) = input;
        SetInventoryDto {
            id,
            stock: input.stock,
            available: input.available,
        }
    }
}

impl Intake<DeleteRequest> for Transformer {
    type To = DeleteBookDto;
    fn emit(&self, input: DeleteRequest) -> Self::To {
        DeleteBookDto { id: input.id }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetBookDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetBookDto { id: input.id }
    }
}

impl GetAllRequest {
    fn paging(self) -> error_stack::Result<(SelectLimit, SelectOffset), KernelError> {
        let limit = self.limit.map(SelectLimit::try_new).transpose()?;
        let offset = self.offset.map(SelectOffset::try_new).transpose()?;
        Ok((limit.unwrap_or_default(), offset.unwrap_or_default()))
    }
}

impl TryIntake<GetAllRequest> for Transformer {
    type To = GetAllBookDto;
    type Error = Report<KernelError>;
    fn emit(&self, input: GetAllRequest) -> Result<Self::To, Self::Error> {
        let (limit, offset) = input.paging()?;
        Ok(GetAllBookDto { limit, offset })
    }
}

/// Catalog page of a library, addressed by its id.
impl TryIntake<(Uuid, GetAllRequest)> for Transformer {
    type To = BrowseCatalogDto;
    type Error = Report<KernelError>;
    fn emit(&self, input: (Uuid, GetAllRequest)) -> Result<Self::To, Self::Error> {
        let (library_id, input) = input;
        let (limit, offset) = input.paging()?;
        Ok(BrowseCatalogDto {
            library_id,
            limit,
            offset,
        })
    }
}
