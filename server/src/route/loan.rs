mod request;
mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::extractor::Caller;
use crate::handler::AppModule;
use application::service::{
    CreateLoanService, ExtendLoanService, GetLoanService, RequestLoanService,
    TransitionLoanService,
};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use uuid::Uuid;

use self::request::{
    CreateRequest, DueDateRequest, GetAllRequest, GetRequest, RequestRequest, StatusRequest,
    Transformer,
};
use self::response::{CreatedPresenter, Presenter};

pub(super) use self::request::{
    GetFromBookRequest, GetFromUserRequest, Transformer as LoanTransformer,
};
pub(super) use self::response::{LoanResponse, Presenter as LoanPresenter};

pub trait LoanRouter {
    fn route_loan(self) -> Self;
}

impl LoanRouter for Router<AppModule> {
    fn route_loan(self) -> Self {
        self.route(
            "/loans",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Query(req): Query<GetAllRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake(req)?
                        .handle(|dto| async move { module.get_loans(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .post(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Json(req): Json<CreateRequest>| async move {
                    Controller::new(Transformer, CreatedPresenter)
                        .intake((*tenant.user_id().as_ref(), req))
                        .handle(|dto| async move { module.create_loan(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/loans/requests",
            post(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Json(req): Json<RequestRequest>| async move {
                    Controller::new(Transformer, CreatedPresenter)
                        .intake(req)
                        .handle(|dto| async move { module.request_loan(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/loans/:id",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| async move { module.get_loan(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/loans/:id/status",
            put(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>,
                 Json(req): Json<StatusRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.transition_loan(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/loans/:id/due-date",
            put(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>,
                 Json(req): Json<DueDateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.extend_loan(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
