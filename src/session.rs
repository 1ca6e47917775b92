use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;

/// Row id in the `sessions` table of the signed-in user.
pub const SESSION_ID: &str = "session_id";
/// Where to send the user once they have logged in.
pub const RETURN_TO: &str = "return_to";
pub const NOTICE: &str = "notice";
pub const ALERT: &str = "alert";

pub fn layer(config: &Config) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session_secure)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            config.session_inactivity_minutes,
        )))
}
