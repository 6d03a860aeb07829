use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod invoice;
pub mod mailer;
pub mod scheduler;
pub mod tenants;

use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::handlers::AppState;
use crate::invoice::{InvoicePipeline, PdfConverter};
use crate::mailer::{Mailer, MockMailer, SmtpMailer};
use crate::tenants::TenantRegistry;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[derive(OpenApi)]
    #[openapi(
        paths(
            crate::handlers::ping,
            crate::handlers::download_invoice,
            crate::handlers::download_all_invoices,
            crate::handlers::send_invoice,
            crate::handlers::send_all_invoices,
        ),
        components(
            schemas(
                handlers::PingResponse,
                handlers::AckResponse,
                dispatch::DispatchResult,
                ErrorResponse,
            )
        ),
        tags(
            (name = "Health", description = "Liveness probing."),
            (name = "Invoices", description = "Invoice generation and distribution endpoints.")
        )
    )]
    struct ApiDoc;

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let registry = match TenantRegistry::load(&config.tenants_file) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            log::error!(
                "Failed to load tenant registry from {}: {e}",
                config.tenants_file.display()
            );
            std::process::exit(1);
        }
    };
    log::info!("Loaded {} tenant(s)", registry.len());

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                log::error!("Failed to configure SMTP mailer: {e}");
                std::process::exit(1);
            }
        },
        None => {
            log::warn!("SMTP_HOST not set; outgoing mail is logged, not delivered");
            Arc::new(MockMailer::new())
        }
    };

    let converter = PdfConverter::new(config.soffice_binary.clone(), config.convert_timeout);
    let mut pipeline = InvoicePipeline::new(converter);
    if let Some(root) = &config.workspace_dir {
        pipeline = pipeline.with_workspace_root(root);
    }
    let dispatcher = Arc::new(Dispatcher::new(registry, pipeline, mailer));

    scheduler::spawn(config.schedule, dispatcher.clone());

    let prometheus = PrometheusMetricsBuilder::new("rent_invoice_server")
        .endpoint("/metrics")
        .build()
        .expect("Failed to create Prometheus metrics middleware");

    let state = web::Data::new(AppState::new(dispatcher));
    let allowed_origins = config.allowed_origins.clone();
    let port = config.port;

    log::info!("Starting server at http://0.0.0.0:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(build_cors(&allowed_origins))
            .app_data(state.clone())
            .configure(configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}

/// Register the service routes. Split out so integration tests can mount the
/// same table on a test `App`.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ping").route(web::get().to(handlers::ping)))
        .service(
            web::scope("/invoices")
                .service(
                    web::resource("/download-all")
                        .route(web::get().to(handlers::download_all_invoices)),
                )
                .service(
                    web::resource("/send-all").route(web::post().to(handlers::send_all_invoices)),
                )
                .service(
                    web::resource("/{tenant}/download")
                        .route(web::get().to(handlers::download_invoice)),
                )
                .service(
                    web::resource("/{tenant}/send").route(web::post().to(handlers::send_invoice)),
                ),
        );
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        cors.allow_any_origin()
    } else {
        origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin))
            .supports_credentials()
    }
}
