use crate::controller::{Controller, Exhaust, Intake};
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use application::service::RegisterLibraryService;
use application::transfer::{RegisterLibraryDto, RegisteredLibraryDto};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    name: String,
    admin_name: String,
    admin_email: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredResponse {
    library_id: Uuid,
    admin_id: Uuid,
}

impl IntoResponse for RegisteredResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

pub struct Transformer;

impl Intake<RegisterRequest> for Transformer {
    type To = RegisterLibraryDto;
    fn emit(&self, input: RegisterRequest) -> Self::To {
        RegisterLibraryDto {
            library_name: input.name,
            admin_name: input.admin_name,
            admin_email: input.admin_email,
        }
    }
}

pub struct Presenter;

impl Exhaust<RegisteredLibraryDto> for Presenter {
    type To = RegisteredResponse;
    fn emit(&self, input: RegisteredLibraryDto) -> Self::To {
        RegisteredResponse {
            library_id: input.library_id,
            admin_id: input.admin_id,
        }
    }
}

pub trait LibraryRouter {
    fn route_library(self) -> Self;
}

impl LibraryRouter for Router<AppModule> {
    fn route_library(self) -> Self {
        // Open registration: the new admin becomes the caller for every later request.
        self.route(
            "/libraries",
            post(
                |State(module): State<AppModule>, Json(req): Json<RegisterRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|dto| async move { module.register_library(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
