use crate::controller::{Intake, TryIntake};
use application::transfer::{CreateUserDto, GetAllUserDto, GetUserDto};
use error_stack::Report;
use kernel::prelude::entity::{SelectLimit, SelectOffset};
use kernel::KernelError;
use serde::Deserialize;
use uuid::Uuid;

fn student() -> String {
    "student".into()
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    name: String,
    email: String,
    #[serde(default = "student")]
    role: String,
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
    type To = CreateUserDto;
    fn emit(&self, input: CreateRequest) -> Self::To {
        CreateUserDto {
            name: input.name,
            email: input.email,
            role: input.role,
        }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetUserDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetUserDto { id: input.id }
    }
}

impl TryIntake<GetAllRequest> for Transformer {
    type To = GetAllUserDto;
    type Error = Report<KernelError>;
    fn emit(&self, input: GetAllRequest) -> Result<Self::To, Self::Error> {
        let limit = input.limit.map(SelectLimit::try_new).transpose()?;
        let offset = input.offset.map(SelectOffset::try_new).transpose()?;
        Ok(GetAllUserDto {
            limit: limit.unwrap_or_default(),
            offset: offset.unwrap_or_default(),
        })
    }
}
