use actix_web::{HttpResponse, ResponseError, web};
use derive_more::derive::{Display, Error};
use tokio::sync::{mpsc, watch};

use crate::climate::event::ClimateEvent;
use crate::climate::schedule::{InvalidPeriod, Period};
use crate::runner::ClimateStatus;

pub fn new_routes(status: watch::Receiver<ClimateStatus>, events: mpsc::Sender<ClimateEvent>) -> actix_web::Scope {
    web::scope("/api")
        .route("/status", web::get().to(get_status))
        .route("/period/{period}", web::put().to(put_period))
        .app_data(web::Data::new(status))
        .app_data(web::Data::new(events))
}

type ApiResponse = Result<HttpResponse, ApiError>;

#[derive(Debug, Error, Display)]
enum ApiError {
    #[display("{}", _0)]
    InvalidPeriod(InvalidPeriod),

    #[display("Climate controller not running")]
    Unavailable,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;

        tracing::warn!("ApiError: {:?}", self);

        match self {
            ApiError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

async fn get_status(status: web::Data<watch::Receiver<ClimateStatus>>) -> ApiResponse {
    let status = status.borrow().clone();
    Ok(HttpResponse::Ok().json(status))
}

async fn put_period(events: web::Data<mpsc::Sender<ClimateEvent>>, period: web::Path<String>) -> ApiResponse {
    let period = period.into_inner();
    period.parse::<Period>().map_err(ApiError::InvalidPeriod)?;

    events
        .send(ClimateEvent::PeriodRequested(period))
        .await
        .map_err(|_| ApiError::Unavailable)?;

    Ok(HttpResponse::Accepted().finish())
}
