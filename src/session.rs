use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Session lifetime: 24 hours
const SESSION_DURATION: u64 = 24 * 60 * 60;

/// An authenticated user session
#[derive(Debug, Clone)]
pub struct Session {
    /// Id of the authenticated user
    pub user_id: i64,

    /// Time when the session was created
    pub created_at: SystemTime,

    /// Time when the session expires
    pub expires_at: SystemTime,
}

/// In-memory store of active sessions
///
/// Maps opaque bearer tokens to authenticated user identities. Held in the
/// application state and constructed explicitly at startup; the contents are
/// volatile and lost on restart.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for a user and return its opaque token
    pub fn create(&self, user_id: i64) -> String {
        let token = Uuid::new_v4().to_string();
        let created_at = SystemTime::now();

        let session = Session {
            user_id,
            created_at,
            expires_at: created_at + Duration::from_secs(SESSION_DURATION),
        };

        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(token.clone(), session);

        token
    }

    /// Resolve a token to a user id, if the session is valid
    ///
    /// Expired sessions are removed on access.
    pub fn validate(&self, token: &str) -> Option<i64> {
        let mut sessions = self.sessions.write().unwrap();

        match sessions.get(token) {
            Some(session) if session.expires_at > SystemTime::now() => Some(session.user_id),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Invalidate a session; unknown tokens are a no-op
    pub fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(token);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_session_validates_to_its_user() {
        let store = SessionStore::new();
        let token = store.create(42);
        assert_eq!(store.validate(&token), Some(42));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = SessionStore::new();
        assert_eq!(store.validate("nope"), None);
    }

    #[test]
    fn revoked_session_no_longer_validates() {
        let store = SessionStore::new();
        let token = store.create(7);
        store.revoke(&token);
        assert_eq!(store.validate(&token), None);
    }

    #[test]
    fn revoking_unknown_token_is_harmless() {
        let store = SessionStore::new();
        store.revoke("missing");
    }

    #[test]
    fn expired_session_is_rejected_and_removed() {
        let store = SessionStore::new();
        let token = "expired-token".to_string();
        let past = SystemTime::now() - Duration::from_secs(1);
        store.sessions.write().unwrap().insert(
            token.clone(),
            Session {
                user_id: 9,
                created_at: past - Duration::from_secs(SESSION_DURATION),
                expires_at: past,
            },
        );

        assert_eq!(store.validate(&token), None);
        assert!(!store.sessions.read().unwrap().contains_key(&token));
    }

    #[test]
    fn tokens_are_unique_per_session() {
        let store = SessionStore::new();
        let a = store.create(1);
        let b = store.create(1);
        assert_ne!(a, b);
    }
}
