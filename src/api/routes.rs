use super::handlers::{admin, honeypot, track, verify};
use actix_web::web;

pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Identity verification routes
            .service(
                web::scope("/verify")
                    .route("/start", web::post().to(verify::start_session))
                    .route("/device", web::post().to(verify::register_device))
                    .route("/behavior", web::post().to(verify::behavior_event))
                    .route("/assess", web::post().to(verify::assess))
                    .route("/name-check", web::post().to(verify::name_check)),
            )
            // Decoy environment routes
            .service(
                web::scope("/honeypot")
                    .route("/enter", web::post().to(honeypot::enter))
                    .route("/track", web::post().to(honeypot::track))
                    .route("/transfer", web::post().to(honeypot::fake_transfer))
                    .route("/balance", web::post().to(honeypot::fake_balance))
                    .route("/report/{session_id}", web::get().to(honeypot::report)),
            )
            // Activity audit routes
            .service(
                web::scope("/track")
                    .route("/login", web::post().to(track::login))
                    .route("/action", web::post().to(track::action))
                    .route("/transaction", web::post().to(track::transaction)),
            )
            // Monitoring routes
            .route("/admin/dashboard", web::get().to(admin::dashboard))
            .route("/health", web::get().to(admin::health)),
    );
}
