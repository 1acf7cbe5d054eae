use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tower_sessions::Session;

use crate::session::{CurrentUser, keys};

pub const LOGIN_PATH: &str = "/usuarios/login";

/// Characters left as-is in the `next` query value. Slashes stay readable so
/// `/orden/` round-trips unchanged.
const NEXT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Extractor for routes that need a logged-in user. Anonymous requests are
/// sent to the login page with a `next` back-reference.
#[derive(Debug, Clone)]
pub struct RequireLogin(pub CurrentUser);

/// Extractor that never rejects; `None` for anonymous requests.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[derive(Debug)]
pub enum LoginRejection {
    RedirectToLogin { next: String },
    MissingSessionLayer,
}

impl IntoResponse for LoginRejection {
    fn into_response(self) -> Response {
        match self {
            LoginRejection::RedirectToLogin { next } => found(&login_url(&next)),
            LoginRejection::MissingSessionLayer => {
                tracing::error!("session layer is not installed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

pub fn login_url(next: &str) -> String {
    format!(
        "{LOGIN_PATH}?next={}",
        utf8_percent_encode(next, NEXT_ENCODE_SET)
    )
}

/// `302 Found` to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Only same-site absolute paths are followed after login. Browsers read a
/// backslash as a slash, so `/\host` counts as off-site too.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path
        }
        _ => "/",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths_are_kept() {
        assert_eq!(safe_next(Some("/orden/")), "/orden/");
        assert_eq!(safe_next(Some("/productos/?page=2")), "/productos/?page=2");
    }

    #[test]
    fn offsite_targets_fall_back_to_root() {
        for next in [
            "//evil.example",
            "/\\evil.example",
            "/\\/evil.example",
            "https://evil.example",
            "/\t/evil.example",
            "/orden/\r\nSet-Cookie: x=1",
            "",
        ] {
            assert_eq!(safe_next(Some(next)), "/", "{next:?} should not be followed");
        }
        assert_eq!(safe_next(None), "/");
    }
}

async fn current_user(session: &Session) -> Option<CurrentUser> {
    match session.get::<CurrentUser>(keys::CURRENT_USER).await {
        Ok(user) => user,
        Err(err) => {
            tracing::warn!(error = %err, "failed to read current user from session");
            None
        }
    }
}

impl<S> FromRequestParts<S> for RequireLogin
where
    S: Send + Sync,
{
    type Rejection = LoginRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(LoginRejection::MissingSessionLayer)?;

        match current_user(session).await {
            Some(user) => Ok(Self(user)),
            None => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| parts.uri.path().to_string());
                Err(LoginRejection::RedirectToLogin { next })
            }
        }
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => current_user(session).await,
            None => None,
        };
        Ok(Self(user))
    }
}
