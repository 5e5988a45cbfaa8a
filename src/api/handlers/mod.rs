pub mod admin;
pub mod honeypot;
pub mod track;
pub mod verify;

use actix_web::http::header;
use actix_web::HttpRequest;

/// Best-effort client address for audit trails; proxies are honoured via
/// the standard forwarding headers.
pub fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

pub fn client_user_agent(req: &HttpRequest) -> String {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
