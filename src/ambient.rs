// ambient.rs
// Purpose: Process-wide ambient context the dispatcher stamps onto records

use std::sync::RwLock;

use lazy_static::lazy_static;

/// Ambient context queried at stamping time.
///
/// Every accessor is best-effort: a provider that cannot produce a field
/// returns `None` and the record simply goes out without it.
pub trait AmbientContext: Send + Sync {
    fn session_user(&self) -> Option<String>;
    fn location(&self) -> Option<String>;
    fn client_agent(&self) -> Option<String>;
}

lazy_static! {
    static ref SESSION_USER: RwLock<Option<String>> = RwLock::new(None);
    static ref LOCATION: RwLock<Option<String>> = RwLock::new(None);
    static ref CLIENT_AGENT: RwLock<Option<String>> = RwLock::new(None);
}

/// Record the identifier of the signed-in user (None on sign-out).
pub fn set_session_user(user: Option<String>) {
    if let Ok(mut slot) = SESSION_USER.write() {
        *slot = user;
    }
}

/// Record the caller's current location (screen, route, URL).
pub fn set_location(location: Option<String>) {
    if let Ok(mut slot) = LOCATION.write() {
        *slot = location;
    }
}

/// Record the client identifier reported for this process.
pub fn set_client_agent(agent: Option<String>) {
    if let Ok(mut slot) = CLIENT_AGENT.write() {
        *slot = agent;
    }
}

/// Default provider reading the process-wide slots above.
///
/// Lock poisoning degrades to "field absent"; stamping never fails.
#[derive(Debug, Default, Clone)]
pub struct ProcessAmbient;

impl AmbientContext for ProcessAmbient {
    fn session_user(&self) -> Option<String> {
        SESSION_USER.read().ok().and_then(|slot| slot.clone())
    }

    fn location(&self) -> Option<String> {
        LOCATION.read().ok().and_then(|slot| slot.clone())
    }

    fn client_agent(&self) -> Option<String> {
        CLIENT_AGENT.read().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_ambient_reflects_setters() {
        set_session_user(Some("user-42".into()));
        set_location(Some("/teams/7".into()));
        set_client_agent(Some("logship-test/1.0".into()));

        let ambient = ProcessAmbient;
        assert_eq!(ambient.session_user().as_deref(), Some("user-42"));
        assert_eq!(ambient.location().as_deref(), Some("/teams/7"));
        assert_eq!(ambient.client_agent().as_deref(), Some("logship-test/1.0"));

        set_session_user(None);
        assert_eq!(ambient.session_user(), None);
    }
}
