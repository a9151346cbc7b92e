//! Session lifecycle driven by the auth identity
//!
//! A session exists exactly while a user is signed in. Signing out tears it
//! down, so no turn outlives the identity that produced it.

use crate::integration::orchestrator::Session;
use crate::{ChatterError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// The signed-in user as reported by the auth context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }
}

/// Builds the per-user session with its collaborators
pub trait SessionFactory: Send + Sync {
    fn create(&self, identity: &UserIdentity) -> Result<Session>;
}

impl<F> SessionFactory for F
where
    F: Fn(&UserIdentity) -> Result<Session> + Send + Sync,
{
    fn create(&self, identity: &UserIdentity) -> Result<Session> {
        self(identity)
    }
}

pub struct SessionHost {
    factory: Box<dyn SessionFactory>,
    identity: Option<UserIdentity>,
    session: Option<Arc<Session>>,
}

impl SessionHost {
    pub fn new(factory: impl SessionFactory + 'static) -> Self {
        Self {
            factory: Box::new(factory),
            identity: None,
            session: None,
        }
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.clone()
    }

    pub fn identity(&self) -> Option<&UserIdentity> {
        self.identity.as_ref()
    }

    /// React to the auth context's identity changing.
    ///
    /// The same user keeps the running session; a different user or `None`
    /// ends it first.
    pub fn identity_changed(
        &mut self,
        identity: Option<UserIdentity>,
    ) -> Result<Option<Arc<Session>>> {
        let Some(identity) = identity else {
            self.end_session();
            return Ok(None);
        };

        if let (Some(current), Some(session)) = (&self.identity, &self.session) {
            if current.id == identity.id {
                let session = Arc::clone(session);
                self.identity = Some(identity);
                return Ok(Some(session));
            }
        }

        self.end_session();
        let session = Arc::new(self.factory.create(&identity)?);
        info!("Session started for user {}", identity.id);

        self.identity = Some(identity);
        self.session = Some(Arc::clone(&session));
        Ok(Some(session))
    }

    /// Start (or keep) the user's session and load its history.
    ///
    /// A failed history fetch is left on the session's error; the session is
    /// still returned so the user can keep chatting.
    pub async fn sign_in(&mut self, identity: UserIdentity) -> Result<Arc<Session>> {
        let session = self
            .identity_changed(Some(identity))?
            .ok_or_else(|| ChatterError::NotFound("session was not created".to_string()))?;

        if !session.history_loaded() {
            if let Err(e) = session.load_history().await {
                warn!("Continuing without chat history: {}", e);
            }
        }
        Ok(session)
    }

    pub fn sign_out(&mut self) {
        self.end_session();
    }

    fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
            if let Some(identity) = &self.identity {
                info!("Session ended for user {}", identity.id);
            }
        }
        self.identity = None;
    }
}

impl Drop for SessionHost {
    fn drop(&mut self) {
        self.end_session();
    }
}
