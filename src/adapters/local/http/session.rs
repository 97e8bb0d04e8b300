use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::AppState;
use crate::domain::Scope;

pub const SESSION_COOKIE: &str = "splitter_session";

/// Resolves the request's [`Scope`] once and stores it as a request
/// extension. Also runs the expired-session sweep, so expiry is driven by
/// traffic rather than a timer.
pub async fn resolve_scope(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if !state.config.session_scoped {
        request.extensions_mut().insert(Scope::Global);
        return next.run(request).await;
    }

    if let Err(e) = state.workspaces.sweep_stale_sessions().await {
        for failure in &e.failures {
            tracing::warn!("Expired session not removed: {}", failure);
        }
    }

    let existing = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Scope::parse_session(cookie.value()));

    match existing {
        Some(scope) => {
            request.extensions_mut().insert(scope);
            next.run(request).await
        }
        None => {
            let scope = Scope::new_session();
            tracing::debug!("Issuing {}", scope);
            request.extensions_mut().insert(scope);
            let response = next.run(request).await;

            let cookie = Cookie::build((SESSION_COOKIE, scope.dir_name()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            (jar.add(cookie), response).into_response()
        }
    }
}
