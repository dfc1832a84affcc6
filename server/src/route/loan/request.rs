use crate::controller::{Intake, TryIntake};
use application::transfer::{
    CreateLoanDto, ExtendLoanDto, GetAllLoanDto, GetLoanDto, GetLoansFromBookDto,
    GetLoansFromUserDto, RequestLoanDto, TransitionLoanDto,
};
use error_stack::Report;
use kernel::prelude::entity::{SelectLimit, SelectOffset};
use kernel::KernelError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    book_id: Uuid,
    /// Omitted when borrowing for oneself.
    user_id: Option<Uuid>,
    duration_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RequestRequest {
    book_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct DueDateRequest {
    due_date: Option<String>,
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

#[derive(Debug)]
pub struct GetFromUserRequest {
    user_id: Uuid,
}

impl GetFromUserRequest {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

#[derive(Debug)]
pub struct GetFromBookRequest {
    book_id: Uuid,
}

impl GetFromBookRequest {
    pub fn new(book_id: Uuid) -> Self {
        Self { book_id }
    }
}

pub struct Transformer;

impl Intake<(Uuid, CreateRequest)> for Transformer {
    type To = CreateLoanDto;
    fn emit(&self, input: (Uuid, CreateRequest)) -> Self::To {
        let (caller, input) = input;
        CreateLoanDto {
            book_id: input.book_id,
            user_id: input.user_id.unwrap_or(caller),
            duration_days: input.duration_days,
        }
    }
}

impl Intake<RequestRequest> for Transformer {
    type To = RequestLoanDto;
    fn emit(&self, input: RequestRequest) -> Self::To {
        RequestLoanDto {
            book_id: input.book_id,
        }
    }
}

impl Intake<(Uuid, StatusRequest)> for Transformer {
    type To = TransitionLoanDto;
    fn emit(&self, input: (Uuid, StatusRequest)) -> Self::To {
        let (id, input) = input;
        TransitionLoanDto {
            id,
            status: input.status,
        }
    }
}

impl Intake<(Uuid, DueDateRequest)> for Transformer {
    type To = ExtendLoanDto;
    fn emit(&self, input: (Uuid, DueDateRequest)) -> Self::To {
        let (id, input) = input;
        ExtendLoanDto {
            id,
            due_date: input.due_date,
        }
    }
}

impl TryIntake<GetAllRequest> for Transformer {
    type To = GetAllLoanDto;
    type Error = Report<KernelError>;
    fn emit(&self, input: GetAllRequest) -> Result<Self::To, Self::Error> {
        let limit = input.limit.map(SelectLimit::try_new).transpose()?;
        let offset = input.offset.map(SelectOffset::try_new).transpose()?;
        Ok(GetAllLoanDto {
            limit: limit.unwrap_or_default(),
            offset: offset.unwrap_or_default(),
        })
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetLoanDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetLoanDto { id: input.id }
    }
}

impl Intake<GetFromUserRequest> for Transformer {
    type To = GetLoansFromUserDto;
    fn emit(&self, input: GetFromUserRequest) -> Self::To {
        GetLoansFromUserDto {
            user_id: input.user_id,
        }
    }
}

impl Intake<GetFromBookRequest> for Transformer {
    type To = GetLoansFromBookDto;
    fn emit(&self, input: GetFromBookRequest) -> Self::To {
        GetLoansFromBookDto {
            book_id: input.book_id,
        }
    }
}
