//! Request-boundary extractors. Authentication itself (OAuth, JWT
//! verification, sessions) is an out-of-scope collaborator (spec.md §1,
//! §6 "Authenticator"); this module only reads whatever identifier that
//! collaborator already attached to the request.

use actix_web::HttpRequest;

use crate::errors::{ApiError, Result};

/// Splits `Host: <pod>.<server-host>[:port]` into the pod label, or
/// `None` for the bare server host (spec.md §6 "Subdomain routing").
pub fn pod_from_host(req: &HttpRequest) -> Option<String> {
    let host = req
        .connection_info()
        .host()
        .split(':')
        .next()
        .unwrap_or("")
        .to_string();
    let server_host = &config::get_config().server.server_host;
    let suffix = format!(".{server_host}");
    if host == *server_host {
        return None;
    }
    host.strip_suffix(&suffix).map(str::to_string)
}

/// The authenticated user id, passed through from the authenticator
/// collaborator as `X-User-Id` (test/dev stand-in for a verified session).
pub fn user_id(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn require_user_id(req: &HttpRequest) -> Result<String> {
    user_id(req).ok_or(ApiError::MissingToken)
}

/// `ip:<addr>` rate-limit identifier, used when no authenticated user is
/// present (spec.md §4.9).
pub fn client_identifier(req: &HttpRequest) -> String {
    match user_id(req) {
        Some(uid) => format!("user:{uid}"),
        None => {
            let ip = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();
            format!("ip:{ip}")
        }
    }
}
