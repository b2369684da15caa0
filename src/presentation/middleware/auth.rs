//! Authentication Middleware
//!
//! Resolves the caller's credential through the configured
//! [`IdentityProvider`](crate::domain::IdentityProvider) and attaches the
//! user id to the request.

use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderMap, Uri},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::Deserialize;

use crate::domain::UserId;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authentication middleware
///
/// Accepts `Authorization: Bearer <token>`. WebSocket upgrade requests may
/// pass `?token=<token>` instead, since browsers cannot set headers on them.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .or_else(|| {
            is_websocket_upgrade(request.headers())
                .then(|| query_token(request.uri()))
                .flatten()
        })
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".into()))?;

    let user_id = state.identity.resolve(&token).await?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_owned())
}

fn query_token(uri: &Uri) -> Option<String> {
    Query::<TokenQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.token)
        .filter(|token| !token.is_empty())
}

fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_query_token_extraction() {
        let uri: Uri = "/api/v1/chats/x/stream?token=abc".parse().unwrap();
        assert_eq!(query_token(&uri).as_deref(), Some("abc"));

        let uri: Uri = "/api/v1/chats/x/stream?token=".parse().unwrap();
        assert!(query_token(&uri).is_none());

        let uri: Uri = "/api/v1/chats/x/stream".parse().unwrap();
        assert!(query_token(&uri).is_none());
    }

    #[test]
    fn test_websocket_upgrade_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_websocket_upgrade(&headers));
        headers.insert(header::UPGRADE, HeaderValue::from_static("WebSocket"));
        assert!(is_websocket_upgrade(&headers));
    }
}
