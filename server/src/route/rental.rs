use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use application::service::{
    AcceptOfferService, CloseRentalService, ConfirmPaymentService, CreateRentalService,
    GetRentalService, SubmitRatingService,
};

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::request::{
    CloseRequest, CreateRentalRequest, GetRentalRequest, GetUserRentalsRequest,
    OfferDecisionRequest, PaymentRequest, RateRequest, RentalTransformer,
};
use crate::response::RentalPresenter;

pub trait RentalRouter {
    fn route_rental(self) -> Self;
}

impl RentalRouter for Router<AppModule> {
    fn route_rental(self) -> Self {
        self.route(
            "/rentals",
            post(
                |State(handler): State<AppModule>, Json(req): Json<CreateRentalRequest>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake(req)
                        .handle(|dto| handler.database().create_rental(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id",
            get(
                |State(handler): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake(GetRentalRequest::new(id))
                        .handle(|dto| handler.database().get_rental(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id/accept",
            post(
                |State(handler): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<OfferDecisionRequest>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake((id, req))
                        .handle(|dto| handler.database().accept_offer(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id/decline",
            post(
                |State(handler): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<OfferDecisionRequest>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake((id, req))
                        .handle(|dto| handler.database().decline_offer(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id/payment",
            post(
                |State(handler): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<PaymentRequest>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake((id, req))
                        .handle(|dto| handler.database().confirm_payment(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id/ratings",
            post(
                |State(handler): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<RateRequest>| async move {
                    let policy = handler.rating_policy().clone();
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake((id, policy, req))
                        .handle(|dto| handler.database().submit_rating(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rentals/:id/close",
            post(
                |State(handler): State<AppModule>,
                 Path(id): Path<Uuid>,
                 Json(req): Json<CloseRequest>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake((id, req))
                        .handle(|dto| handler.database().close_rental(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/users/:id/rentals",
            get(
                |State(handler): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(RentalTransformer, RentalPresenter)
                        .intake(GetUserRentalsRequest::new(id))
                        .handle(|dto| handler.database().get_participant_rentals(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
