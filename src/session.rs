//! Session state and the session manager layer.

use serde::{Deserialize, Serialize};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore, cookie::SameSite};
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "checkout_session";

/// Two weeks of inactivity.
const SESSION_EXPIRY_SECONDS: i64 = 14 * 24 * 60 * 60;

/// Identity of the logged-in user, as kept in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
}

pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
    pub const CART_ID: &str = "cart_id";
    pub const ORDER_ID: &str = "order_id";
}

pub fn create_session_layer<Store>(store: Store, secure: bool) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
