//! Pre-dispatch authorization middleware for axum
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/admin/users", get(list_users))
//!     .route_layer(middleware::from_fn_with_state(authorizer.clone(), require_authorization));
//! ```
//!
//! The session layer in front of this middleware is expected to put the
//! caller's [`Identity`] into the request extensions.

use crate::authorizer::{AccessMode, AccessRequest, RequestAuthorizer};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use gatehouse_core::Identity;
use std::sync::Arc;
use tracing::warn;

/// Run the request only if the authorizer allows it.
///
/// Denied API-key requests get `401`; denied session requests are redirected
/// to the configured login path.
pub async fn require_authorization(
    State(authorizer): State<Arc<RequestAuthorizer>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_string();
    let path = request.uri().path().to_string();

    // a present but unreadable header still selects API-key mode
    let api_key = request
        .headers()
        .get(authorizer.config().api_key_header.as_str())
        .map(|value| value.to_str().unwrap_or_default().to_string());
    let identity = request.extensions().get::<Identity>().cloned();

    let decision = authorizer
        .authorize(&AccessRequest {
            method: &method,
            path: &path,
            api_key: api_key.as_deref(),
            identity: identity.as_ref(),
        })
        .await;

    if decision.allowed {
        return next.run(request).await;
    }

    match decision.mode {
        AccessMode::ApiKey => {
            warn!(method = %method, path = %path, "API request unauthorized");
            StatusCode::UNAUTHORIZED.into_response()
        }
        AccessMode::Session => {
            Redirect::to(&authorizer.config().login_path).into_response()
        }
    }
}
