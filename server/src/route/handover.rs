use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use application::service::{
    AcceptHandoverService, CreateHandoverService, DeclineHandoverService, GetHandoverService,
};

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::request::{CreateHandoverRequest, HandoverDecisionRequest, HandoverTransformer};
use crate::response::HandoverPresenter;

pub trait HandoverRouter {
    fn route_handover(self) -> Self;
}

impl HandoverRouter for Router<AppModule> {
    fn route_handover(self) -> Self {
        self.route(
            "/rentals/:rental_id/handovers",
            post(
                |State(handler): State<AppModule>,
                 Path(rental_id): Path<Uuid>,
                 Json(req): Json<CreateHandoverRequest>| async move {
                    Controller::new(HandoverTransformer, HandoverPresenter)
                        .intake((rental_id, req))
                        .handle(|dto| handler.database().create_handover(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:rental_id/handovers/:handover_id",
            get(
                |State(handler): State<AppModule>,
                 Path(ids): Path<(Uuid, Uuid)>| async move {
                    Controller::new(HandoverTransformer, HandoverPresenter)
                        .intake(ids)
                        .handle(|dto| handler.database().get_handover(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:rental_id/handovers/:handover_id/accept",
            post(
                |State(handler): State<AppModule>,
                 Path(ids): Path<(Uuid, Uuid)>,
                 Json(req): Json<HandoverDecisionRequest>| async move {
                    Controller::new(HandoverTransformer, HandoverPresenter)
                        .intake((ids, req))
                        .handle(|dto| handler.database().accept_handover(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:rental_id/handovers/:handover_id/decline",
            post(
                |State(handler): State<AppModule>,
                 Path(ids): Path<(Uuid, Uuid)>,
                 Json(req): Json<HandoverDecisionRequest>| async move {
                    Controller::new(HandoverTransformer, HandoverPresenter)
                        .intake((ids, req))
                        .handle(|dto| handler.database().decline_handover(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
