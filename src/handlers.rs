//! HTTP handlers.
//!
//! Synchronous download routes hold the request open for the duration of the
//! pipeline run. Mail trigger routes spawn the send onto the runtime and
//! acknowledge immediately; completion is observable in the logs only.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::invoice::PipelineError;
use crate::ErrorResponse;

/// Shared handler state.
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

/// Optional reference-date override for backdated invoice runs.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Reference date (YYYY-MM-DD); defaults to today.
    pub date: Option<NaiveDate>,
}

impl DateQuery {
    fn reference(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[derive(Serialize, ToSchema)]
pub struct PingResponse {
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct AckResponse {
    pub status: String,
    pub detail: String,
}

#[utoipa::path(
    tag = "Health",
    get,
    path = "/ping",
    responses(
        (status = 200, description = "Service liveness acknowledgment", body = PingResponse)
    )
)]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(PingResponse {
        status: "Service is up".to_string(),
    })
}

#[utoipa::path(
    tag = "Invoices",
    get,
    path = "/invoices/{tenant}/download",
    params(
        ("tenant" = String, Path, description = "Tenant key from the registry"),
        DateQuery
    ),
    responses(
        (status = 200, description = "Signed invoice PDF", content_type = "application/pdf"),
        (status = 404, description = "Unknown tenant", body = ErrorResponse),
        (status = 500, description = "Pipeline failure", body = ErrorResponse)
    )
)]
pub async fn download_invoice(
    tenant: web::Path<String>,
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.dispatcher.generate(&tenant, query.reference()).await {
        Ok(invoice) => pdf_attachment(&invoice.filename, invoice.pdf),
        Err(e) => error_response(&tenant, e),
    }
}

#[utoipa::path(
    tag = "Invoices",
    get,
    path = "/invoices/download-all",
    params(DateQuery),
    responses(
        (status = 200, description = "Zip archive of every tenant's signed invoice", content_type = "application/zip"),
        (status = 500, description = "Pipeline failure", body = ErrorResponse)
    )
)]
pub async fn download_all_invoices(
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.dispatcher.bundle_all(query.reference()).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header((
                "Content-Disposition",
                "attachment; filename=\"invoices.zip\"",
            ))
            .body(bytes),
        Err(e) => error_response("batch", e),
    }
}

#[utoipa::path(
    tag = "Invoices",
    post,
    path = "/invoices/{tenant}/send",
    params(
        ("tenant" = String, Path, description = "Tenant key from the registry"),
        DateQuery
    ),
    responses(
        (status = 202, description = "Send scheduled", body = AckResponse),
        (status = 404, description = "Unknown tenant", body = ErrorResponse)
    )
)]
pub async fn send_invoice(
    tenant: web::Path<String>,
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let tenant = tenant.into_inner();
    if state.dispatcher.registry().get(&tenant).is_none() {
        return HttpResponse::NotFound().json(ErrorResponse::not_found("Unknown tenant"));
    }

    let dispatcher = state.dispatcher.clone();
    let reference = query.reference();
    let key = tenant.clone();
    tokio::spawn(async move {
        if let Err(e) = dispatcher.send_one(&key, reference).await {
            log::error!("deferred send failed for tenant {key}: {e}");
        }
    });

    HttpResponse::Accepted().json(AckResponse {
        status: "scheduled".to_string(),
        detail: format!("Invoice email for '{tenant}' scheduled"),
    })
}

#[utoipa::path(
    tag = "Invoices",
    post,
    path = "/invoices/send-all",
    params(DateQuery),
    responses(
        (status = 202, description = "Batch send scheduled", body = AckResponse)
    )
)]
pub async fn send_all_invoices(
    query: web::Query<DateQuery>,
    state: web::Data<AppState>,
) -> impl Responder {
    let dispatcher = state.dispatcher.clone();
    let reference = query.reference();
    tokio::spawn(async move {
        let results = dispatcher.send_all(reference).await;
        let failures = results.iter().filter(|r| !r.ok).count();
        log::info!(
            "deferred batch send finished: {} ok, {failures} failed",
            results.len() - failures
        );
    });

    HttpResponse::Accepted().json(AckResponse {
        status: "scheduled".to_string(),
        detail: "Batch invoice email scheduled for all tenants".to_string(),
    })
}

fn pdf_attachment(filename: &str, bytes: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(bytes)
}

/// Full detail goes to the log; the response body carries a summary without
/// file-system paths or converter output.
fn error_response(scope: &str, error: DispatchError) -> HttpResponse {
    log::error!("invoice request failed ({scope}): {error}");
    match &error {
        DispatchError::UnknownTenant(_) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found("Unknown tenant"))
        }
        DispatchError::Pipeline(PipelineError::AssetMissing(kind)) => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error(&format!("{kind} not found on server"))),
        DispatchError::Pipeline(PipelineError::Convert(_)) => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Document conversion failed")),
        DispatchError::Pipeline(PipelineError::Signature(_)) => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Signature compositing failed")),
        DispatchError::Pipeline(PipelineError::Template(_)) => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Template population failed")),
        _ => HttpResponse::InternalServerError()
            .json(ErrorResponse::internal_error("Invoice generation failed")),
    }
}
