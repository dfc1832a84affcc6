mod request;
mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::extractor::Caller;
use crate::handler::AppModule;
use crate::route::loan::{GetFromUserRequest, LoanPresenter, LoanTransformer};
use application::service::{CreateUserService, GetLoanService, GetUserService};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use self::request::{CreateRequest, GetAllRequest, GetRequest, Transformer};
use self::response::Presenter;

pub trait UserRouter {
    fn route_user(self) -> Self;
}

impl UserRouter for Router<AppModule> {
    fn route_user(self) -> Self {
        self.route(
            "/users",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Query(req): Query<GetAllRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake(req)?
                        .handle(|dto| async move { module.get_users(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .post(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Json(req): Json<CreateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(req)
                        .handle(|dto| async move { module.create_user(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/users/:id",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| async move { module.get_user(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/users/:id/loans",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(LoanTransformer, LoanPresenter)
                        .intake(GetFromUserRequest::new(id))
                        .handle(|dto| async move { module.get_loans_from_user(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
