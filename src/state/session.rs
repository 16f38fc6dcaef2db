use crate::types::{Role, User};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Who the client is acting as. The token only ever exists together with
/// the user it was issued for.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated { user: User, token: String },
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { token, .. } => Some(token),
            Self::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            Self::Anonymous => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user().map(|u| u.id.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}

/// Single-writer owner of the process-wide [`Session`]. Every write replaces
/// the whole value, so readers never see a token paired with another user.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::Anonymous);
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn sign_in(&self, user: User, token: String) {
        info!(user_id = %user.id, role = user.role.as_str(), "session authenticated");
        self.tx.send_replace(Session::Authenticated { user, token });
    }

    /// Swaps in a refreshed token for the user identified by `user_id`.
    /// Nothing changes if the session has since moved to a different user or
    /// to anonymous; returns whether the rotation applied.
    pub fn rotate_token(&self, user_id: &str, token: String) -> bool {
        let mut applied = false;
        self.tx.send_if_modified(|session| match session {
            Session::Authenticated { user, token: current } if user.id == user_id => {
                *current = token;
                applied = true;
                true
            }
            _ => false,
        });
        if applied {
            info!(user_id, "session token rotated");
        }
        applied
    }

    /// Returns to anonymous only if the session still belongs to `user_id`;
    /// returns whether it was torn down.
    pub fn expire(&self, user_id: &str) -> bool {
        let expired = self.tx.send_if_modified(|session| match session {
            Session::Authenticated { user, .. } if user.id == user_id => {
                *session = Session::Anonymous;
                true
            }
            _ => false,
        });
        if expired {
            info!(user_id, "session expired");
        }
        expired
    }

    /// Returns to anonymous. Returns the session that was torn down.
    pub fn sign_out(&self) -> Session {
        let previous = self.tx.send_replace(Session::Anonymous);
        if let Some(user) = previous.user() {
            info!(user_id = %user.id, "session cleared");
        }
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: None,
            email: Some(format!("{id}@example.com")),
            phone: None,
            address: None,
            role: Role::User,
            status: None,
        }
    }

    #[test]
    fn rotate_token_keeps_user_identity() {
        let store = SessionStore::new();
        store.sign_in(user("u1"), "T1".to_string());

        assert!(store.rotate_token("u1", "T2".to_string()));
        let session = store.snapshot();
        assert_eq!(session.user_id(), Some("u1"));
        assert_eq!(session.token(), Some("T2"));
    }

    #[test]
    fn rotate_token_is_ignored_for_another_user() {
        let store = SessionStore::new();
        store.sign_in(user("u2"), "T9".to_string());

        assert!(!store.rotate_token("u1", "T2".to_string()));
        assert_eq!(store.snapshot().token(), Some("T9"));
        assert_eq!(store.snapshot().user_id(), Some("u2"));
    }

    #[test]
    fn rotate_token_does_not_authenticate_anonymous_session() {
        let store = SessionStore::new();
        assert!(!store.rotate_token("u1", "T2".to_string()));
        assert_eq!(store.snapshot(), Session::Anonymous);
    }

    #[test]
    fn expire_only_tears_down_the_matching_user() {
        let store = SessionStore::new();
        store.sign_in(user("u2"), "T9".to_string());

        assert!(!store.expire("u1"));
        assert_eq!(store.snapshot().user_id(), Some("u2"));

        assert!(store.expire("u2"));
        assert_eq!(store.snapshot(), Session::Anonymous);
        assert!(!store.expire("u2"));
    }

    #[test]
    fn sign_out_clears_user_and_token_together() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.sign_in(user("u1"), "T1".to_string());
        let previous = store.sign_out();

        assert_eq!(previous.user_id(), Some("u1"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Session::Anonymous);
    }
}
