use serde::{Deserialize, Serialize};

/// Seconds a session stays valid after creation.
pub const SESSION_TTL_SECS: i64 = 24 * 3600;

/// A bearer session handed out at login. The `user_id` doubles as the bearer
/// token; there is no password auth in this system.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub expires_at: i64,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at <= now_unix
    }
}
