use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use error_stack::{AttachmentKind, FrameKind, Report};
use kernel::KernelError;
use serde::Serialize;
use std::process::{ExitCode, Termination};

#[derive(Debug)]
pub struct StackTrace(Report<KernelError>);

impl From<Report<KernelError>> for StackTrace {
    fn from(e: Report<KernelError>) -> Self {
        StackTrace(e)
    }
}

impl Termination for StackTrace {
    fn report(self) -> ExitCode {
        self.0.report()
    }
}

#[derive(Debug)]
pub struct ErrorStatus(Report<KernelError>);

impl From<Report<KernelError>> for ErrorStatus {
    fn from(e: Report<KernelError>) -> Self {
        ErrorStatus(e)
    }
}

impl From<KernelError> for ErrorStatus {
    fn from(e: KernelError) -> Self {
        ErrorStatus(Report::new(e))
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn status_of(error: &KernelError) -> StatusCode {
    match error {
        KernelError::NotFound => StatusCode::NOT_FOUND,
        KernelError::PermissionDenied => StatusCode::FORBIDDEN,
        KernelError::InvalidInput => StatusCode::BAD_REQUEST,
        KernelError::Unavailable
        | KernelError::LimitExceeded
        | KernelError::InvalidTransition
        | KernelError::AmbiguousMatch
        | KernelError::InventoryOverflow
        | KernelError::HasActiveLoans
        | KernelError::Concurrency => StatusCode::CONFLICT,
        KernelError::Timeout => StatusCode::REQUEST_TIMEOUT,
        KernelError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// Innermost printable attachment closest to the top of the report.
fn message_of(report: &Report<KernelError>) -> Option<String> {
    report.frames().find_map(|frame| match frame.kind() {
        FrameKind::Attachment(AttachmentKind::Printable(printable)) => {
            Some(printable.to_string())
        }
        _ => None,
    })
}

impl IntoResponse for ErrorStatus {
    fn into_response(self) -> axum::response::Response {
        let error = self.0.current_context();
        let status = status_of(error);
        let message = if status.is_server_error() {
            tracing::error!("{:?}", self.0);
            error.to_string()
        } else {
            tracing::debug!("{:?}", self.0);
            message_of(&self.0).unwrap_or_else(|| error.to_string())
        };
        let body = ErrorBody {
            error: error.kind(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
