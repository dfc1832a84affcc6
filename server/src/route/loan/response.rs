use crate::controller::Exhaust;
use crate::error::ErrorStatus;
use application::transfer::LoanDto;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use error_stack::Report;
use kernel::KernelError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    id: Uuid,
    book_id: Uuid,
    user_id: Uuid,
    status: String,
    borrowed_at: String,
    due_date: String,
    returned_at: Option<String>,
}

impl From<LoanDto> for LoanResponse {
    fn from(value: LoanDto) -> Self {
        Self {
            id: value.id,
            book_id: value.book_id,
            user_id: value.user_id,
            status: value.status,
            borrowed_at: value.borrowed_at,
            due_date: value.due_date,
            returned_at: value.returned_at,
        }
    }
}

impl IntoResponse for LoanResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A loan that did not exist before the request.
pub struct CreatedLoanResponse(LoanResponse);

impl IntoResponse for CreatedLoanResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

pub struct Presenter;

impl Exhaust<LoanDto> for Presenter {
    type To = LoanResponse;
    fn emit(&self, input: LoanDto) -> Self::To {
        LoanResponse::from(input)
    }
}

impl Exhaust<Option<LoanDto>> for Presenter {
    type To = Result<LoanResponse, ErrorStatus>;
    fn emit(&self, input: Option<LoanDto>) -> Self::To {
        input.map(LoanResponse::from).ok_or_else(|| {
            ErrorStatus::from(Report::new(KernelError::NotFound).attach_printable("loan not found"))
        })
    }
}

impl Exhaust<Vec<LoanDto>> for Presenter {
    type To = Json<Vec<LoanResponse>>;
    fn emit(&self, input: Vec<LoanDto>) -> Self::To {
        Json(input.into_iter().map(LoanResponse::from).collect())
    }
}

pub struct CreatedPresenter;

impl Exhaust<LoanDto> for CreatedPresenter {
    type To = CreatedLoanResponse;
    fn emit(&self, input: LoanDto) -> Self::To {
        CreatedLoanResponse(LoanResponse::from(input))
    }
}
