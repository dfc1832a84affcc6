mod request;
mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::extractor::Caller;
use crate::handler::AppModule;
use crate::route::loan::{GetFromBookRequest, LoanPresenter, LoanTransformer};
use application::service::{
    CreateBookService, DeleteBookService, GetBookService, GetLoanService,
    SetBookInventoryService, UpdateBookService,
};
use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use uuid::Uuid;

use self::request::{
    CreateRequest, DeleteRequest, GetAllRequest, GetRequest, InventoryRequest, Transformer,
    UpdateRequest,
};
use self::response::Presenter;

pub trait BookRouter {
    fn route_book(self) -> Self;
}

impl BookRouter for Router<AppModule> {
    fn route_book(self) -> Self {
        self.route(
            "/books",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Query(req): Query<GetAllRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake(req)?
                        .handle(|dto| async move { module.get_books(&tenant, dto).await })
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
                        .handle(|dto| async move { module.create_book(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/books/:id",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| async move { module.get_book(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .patch(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>,
                 Json(req): Json<UpdateRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.update_book(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .delete(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(DeleteRequest::new(id))
                        .handle(|dto| async move { module.delete_book(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/books/:id/inventory",
            put(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>,
                 Json(req): Json<InventoryRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.set_book_inventory(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/books/:id/loans",
            get(
                |State(module): State<AppModule>,
                 Caller(tenant): Caller,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(LoanTransformer, LoanPresenter)
                        .intake(GetFromBookRequest::new(id))
                        .handle(|dto| async move { module.get_loans_from_book(&tenant, dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/libraries/:id/catalog",
            get(
                |State(module): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Query(req): Query<GetAllRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .try_intake((id, req))?
                        .handle(|dto| async move { module.browse_catalog(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
