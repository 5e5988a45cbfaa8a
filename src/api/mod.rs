pub mod handlers;
pub mod middleware;
pub mod routes;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use chrono::Utc;
use log::{debug, info};

use crate::audit::ActivityAuditor;
use crate::config::Settings;
use crate::errors::VerifyError;
use crate::honeypot::HoneypotStore;
use crate::session::{InMemorySessionStore, SessionStore};
use crate::telecom::{CarrierDirectory, MockCarrierDirectory};
use middleware::logging::RequestLogger;

/// Shared service state. The stores sit behind trait objects so that the
/// handlers stay independent of the in-memory backing.
pub struct AppState {
    pub settings: Settings,
    pub sessions: Arc<dyn SessionStore>,
    pub carrier: Arc<dyn CarrierDirectory>,
    pub honeypots: Arc<HoneypotStore>,
    pub auditor: Arc<ActivityAuditor>,
}

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    VerifyError::InvalidInput(err.to_string()).into()
}

pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let carrier: Arc<dyn CarrierDirectory> = Arc::new(MockCarrierDirectory::load_or_empty(
        Path::new(&settings.carrier_data_path),
    )?);
    let sessions: Arc<dyn SessionStore> =
        Arc::new(InMemorySessionStore::new(settings.session_ttl_minutes));
    let honeypots = Arc::new(HoneypotStore::new(settings.session_ttl_minutes));
    let auditor = Arc::new(ActivityAuditor::new(settings.starting_balance));

    // Background sweep for sessions past their idle window.
    {
        let sessions = Arc::clone(&sessions);
        let honeypots = Arc::clone(&honeypots);
        let interval = Duration::from_secs(settings.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let now = Utc::now();
                let purged = sessions.purge_expired(now) + honeypots.purge_expired(now);
                if purged > 0 {
                    debug!("purged {} expired sessions", purged);
                }
            }
        });
    }

    let server_address = format!("{}:{}", settings.api_host, settings.api_port);
    info!("Starting API server on {}", server_address);

    let workers = settings.workers;
    HttpServer::new(move || {
        let cors = if settings.cors_origin == "*" {
            Cors::default().allow_any_origin()
        } else {
            Cors::default().allowed_origin(&settings.cors_origin)
        }
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allowed_headers(vec!["Authorization", "Content-Type"])
        .max_age(3600);

        let state = AppState {
            settings: settings.clone(),
            sessions: Arc::clone(&sessions),
            carrier: Arc::clone(&carrier),
            honeypots: Arc::clone(&honeypots),
            auditor: Arc::clone(&auditor),
        };

        App::new()
            .wrap(cors)
            .wrap(RequestLogger::new())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .app_data(web::Data::new(state))
            .configure(routes::register_routes)
    })
    .bind(server_address)?
    .workers(workers)
    .run()
    .await?;

    Ok(())
}
