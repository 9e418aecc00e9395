use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::persist::{MemoryPersistence, PersistedSession, SessionPersistence};
use super::state::{Notification, NotificationLevel, Session, MAX_NOTIFICATIONS};
use crate::identity::{Principal, Role};

/// Observable session container.
///
/// Readers take snapshots or subscribe; every mutation publishes a new
/// snapshot to subscribers and writes the persisted subset. Writers are
/// crate-private: only the bootstrap protocol changes the session.
pub struct SessionStore {
    state: watch::Sender<Session>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    /// Restore from `persistence` before any network activity. A snapshot that
    /// cannot be read starts the store empty.
    pub fn restore(persistence: Arc<dyn SessionPersistence>) -> Self {
        let initial = match persistence.load() {
            Ok(Some(snap)) => snap.into_session(),
            Ok(None) => Session::default(),
            Err(e) => {
                warn!(target: "ecochain", "could not restore session state: {}", e);
                Session::default()
            }
        };
        debug!(target: "ecochain", "session restored: authenticated={} role={:?}", initial.is_authenticated, initial.role);
        let (state, _) = watch::channel(initial);
        Self { state, persistence }
    }

    pub fn in_memory() -> Self { Self::restore(Arc::new(MemoryPersistence::new())) }

    pub fn snapshot(&self) -> Session { self.state.borrow().clone() }

    pub fn subscribe(&self) -> watch::Receiver<Session> { self.state.subscribe() }

    pub fn is_admin(&self) -> bool { self.state.borrow().is_admin() }
    pub fn is_validator(&self) -> bool { self.state.borrow().is_validator() }
    pub fn can_submit(&self) -> bool { self.state.borrow().can_submit() }
    pub fn should_show_role_selection(&self) -> bool { self.state.borrow().should_show_role_selection() }

    fn commit<F: FnOnce(&mut Session)>(&self, f: F) {
        self.state.send_modify(f);
        let snap = PersistedSession::from_session(&self.state.borrow());
        if let Err(e) = self.persistence.save(&snap) {
            warn!(target: "ecochain", "could not persist session state: {}", e);
        }
    }

    /// Resolved, registered session.
    pub(crate) fn set_user(&self, principal: Principal, role: Role) {
        self.commit(|s| {
            s.principal = Some(principal);
            s.role = Some(role);
            s.is_authenticated = true;
            s.needs_role_selection = false;
            s.is_loading = false;
        });
    }

    /// Authenticated but unregistered; role must be chosen.
    pub(crate) fn set_needs_role_selection(&self, principal: Principal) {
        self.commit(|s| {
            s.principal = Some(principal);
            s.role = None;
            s.is_authenticated = true;
            s.needs_role_selection = true;
            s.is_loading = false;
        });
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.commit(|s| s.is_loading = loading);
    }

    /// Back to the empty signed-out shape, notifications included.
    pub(crate) fn clear(&self) {
        self.commit(|s| *s = Session::default());
    }

    pub(crate) fn notify<S: Into<String>>(&self, level: NotificationLevel, message: S) {
        let n = Notification::new(level, message);
        self.commit(|s| {
            s.notifications.push(n);
            if s.notifications.len() > MAX_NOTIFICATIONS {
                let excess = s.notifications.len() - MAX_NOTIFICATIONS;
                s.notifications.drain(..excess);
            }
        });
    }

    pub(crate) fn dismiss_notification(&self, id: Uuid) -> bool {
        let mut found = false;
        self.commit(|s| {
            let before = s.notifications.len();
            s.notifications.retain(|n| n.id != id);
            found = s.notifications.len() != before;
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_publish_and_persist() {
        let mem = Arc::new(MemoryPersistence::new());
        let store = SessionStore::restore(mem.clone());
        let mut rx = store.subscribe();
        store.set_user(Principal::anonymous(), Role::Validator);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().role, Some(Role::Validator));
        let saved = mem.snapshot().unwrap();
        assert_eq!(saved.role, Some(Role::Validator));
        assert!(saved.is_authenticated);
    }

    #[test]
    fn restore_resets_loading() {
        let mem = Arc::new(MemoryPersistence::new());
        let store = SessionStore::restore(mem.clone());
        store.set_user(Principal::anonymous(), Role::Admin);
        store.set_loading(true);
        assert!(store.snapshot().is_loading);

        let reloaded = SessionStore::restore(mem);
        let s = reloaded.snapshot();
        assert!(!s.is_loading);
        assert_eq!(s.role, Some(Role::Admin));
        assert_eq!(s.principal, Some(Principal::anonymous()));
        assert!(s.is_authenticated && !s.needs_role_selection);
    }

    #[test]
    fn notifications_are_bounded_and_dismissable() {
        let store = SessionStore::in_memory();
        for i in 0..(MAX_NOTIFICATIONS + 5) {
            store.notify(NotificationLevel::Info, format!("n{}", i));
        }
        let s = store.snapshot();
        assert_eq!(s.notifications.len(), MAX_NOTIFICATIONS);
        assert_eq!(s.notifications[0].message, "n5");
        let id = s.notifications[0].id;
        assert!(store.dismiss_notification(id));
        assert!(!store.dismiss_notification(id));
    }

    #[test]
    fn clear_yields_empty_shape() {
        let store = SessionStore::in_memory();
        store.set_needs_role_selection(Principal::anonymous());
        store.notify(NotificationLevel::Error, "x");
        store.clear();
        assert_eq!(store.snapshot(), Session::default());
    }
}
