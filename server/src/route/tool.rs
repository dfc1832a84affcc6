mod request;

use crate::controller::{Controller, Exhaust};
use crate::error::ErrorStatus;
use crate::extractor::Caller;
use crate::handler::AppModule;
use crate::route::loan::LoanResponse;
use application::service::{CreateLoanService, ExtendLoanService, TransitionLoanService};
use application::transfer::LoanDto;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use error_stack::Report;
use kernel::KernelError;
use serde::Serialize;
use serde_json::Value;

use self::request::{ToolCommand, Transformer};

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    tool: &'static str,
    result: LoanResponse,
}

impl IntoResponse for ToolResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

pub struct Presenter;

impl Exhaust<(&'static str, LoanDto)> for Presenter {
    type To = ToolResponse;
    fn emit(&self, input: (&'static str, LoanDto)) -> Self::To {
        let (tool, loan) = input;
        ToolResponse {
            tool,
            result: LoanResponse::from(loan),
        }
    }
}

pub trait ToolRouter {
    fn route_tool(self) -> Self;
}

impl ToolRouter for Router<AppModule> {
    fn route_tool(self) -> Self {
        self.route(
            "/tools",
            post(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Json(req): Json<Value>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake(req)?
                        .handle(|command| async move {
                            let tool = command.name();
                            tracing::debug!(tool, "chat tool call");
                            let loan = match command {
                                ToolCommand::Borrow(dto) => {
                                    module.borrow_by_names(&tenant, dto).await?
                                }
                                ToolCommand::Return(dto) => {
                                    module.return_by_names(&tenant, dto).await?
                                }
                                ToolCommand::Renew(dto) => module.renew_loan(&tenant, dto).await?,
                            };
                            Ok::<_, Report<KernelError>>((tool, loan))
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
