use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use ecoaction_types::api::{Ack, AuthResponse};
use ecoaction_types::events::ClientEvent;
use ecoaction_types::models::SessionUser;

use crate::auth::AuthService;
use crate::error::{ClientError, Result};
use crate::events::EventHub;
use crate::session::{Credential, TokenStore};

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub user: Option<SessionUser>,
    /// True until `mount` has finished.
    pub loading: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

struct Session {
    credential: Option<Credential>,
    user: Option<SessionUser>,
    loading: bool,
    /// Bumped whenever a session starts or ends. Results of calls begun
    /// under an older generation are dropped.
    generation: u64,
}

/// Owns the signed-in user and the bearer token. Handles are cheap to clone
/// and share one session.
///
/// The session lock is never held across an await point: network calls run
/// first, then credential and user are written together in one critical
/// section.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<AuthContextInner>,
}

struct AuthContextInner {
    auth: AuthService,
    store: Arc<dyn TokenStore>,
    session: RwLock<Session>,
    events: EventHub,
}

impl AuthContext {
    pub fn new(auth: AuthService, store: Arc<dyn TokenStore>, events: EventHub) -> Self {
        Self {
            inner: Arc::new(AuthContextInner {
                auth,
                store,
                session: RwLock::new(Session {
                    credential: None,
                    user: None,
                    loading: true,
                    generation: 0,
                }),
                events,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.inner.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.inner.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Restore the session from the token store. A stored token that has
    /// expired, or that `/auth/me` rejects, is discarded. If a login, logout
    /// or invalidation happens while `/auth/me` is in flight, the restored
    /// user is dropped and the newer state stands.
    pub async fn mount(&self) -> Result<Option<SessionUser>> {
        let generation = self.generation();
        let stored = match self.inner.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                self.write().loading = false;
                return Err(e);
            }
        };

        let Some(credential) = stored else {
            self.write().loading = false;
            debug!("no stored session");
            return Ok(None);
        };

        if credential.is_expired() {
            info!("stored session token has expired");
            self.discard_stored(generation);
            self.write().loading = false;
            return Ok(None);
        }

        match self.inner.auth.me(&credential).await {
            Ok(me) => {
                let user = SessionUser::from(me);
                let applied = {
                    let mut session = self.write();
                    session.loading = false;
                    if session.generation == generation {
                        session.credential = Some(credential);
                        session.user = Some(user.clone());
                        session.generation += 1;
                        true
                    } else {
                        false
                    }
                };
                if applied {
                    info!(user_id = user.id(), "session restored");
                    self.inner.events.publish(ClientEvent::SignedIn { user_id: user.id() });
                    Ok(Some(user))
                } else {
                    debug!("discarding restored session superseded while mounting");
                    Ok(self.current_user())
                }
            }
            Err(e) => {
                warn!("stored session rejected: {}", e);
                self.discard_stored(generation);
                self.write().loading = false;
                Ok(None)
            }
        }
    }

    fn discard_stored(&self, generation: u64) {
        // The store already belongs to a newer session, or was cleared.
        if self.generation() != generation {
            return;
        }
        if let Err(e) = self.inner.store.clear() {
            warn!("failed to clear stored token: {}", e);
        }
        self.inner.events.publish(ClientEvent::SessionExpired);
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<SessionUser> {
        let resp = self.inner.auth.login(email, password).await?;
        let user = self.establish(resp)?;
        info!(user_id = user.id(), "logged in");
        Ok(user)
    }

    pub async fn register(&self, full_name: &str, email: &str, password: &str) -> Result<SessionUser> {
        let resp = self.inner.auth.register(full_name, email, password).await?;
        let user = self.establish(resp)?;
        info!(user_id = user.id(), "signed up");
        Ok(user)
    }

    /// Persist the token, then publish token and user in one write.
    fn establish(&self, resp: AuthResponse) -> Result<SessionUser> {
        let (token, user) = resp.into_parts();
        let credential = Credential::new(token);
        self.inner.store.save(&credential)?;

        {
            let mut session = self.write();
            session.credential = Some(credential);
            session.user = Some(user.clone());
            session.loading = false;
            session.generation += 1;
        }

        self.inner.events.publish(ClientEvent::SignedIn { user_id: user.id() });
        Ok(user)
    }

    /// Forget the token and the user. Calling it with no session is a no-op.
    pub fn logout(&self) -> Result<()> {
        let had_session = {
            let mut session = self.write();
            let credential = session.credential.take();
            let user = session.user.take();
            session.loading = false;
            session.generation += 1;
            credential.is_some() || user.is_some()
        };

        self.inner.store.clear()?;

        if had_session {
            info!("logged out");
            self.inner.events.publish(ClientEvent::SignedOut);
        }
        Ok(())
    }

    /// Drop a session the backend no longer accepts (a 401 on an
    /// authenticated call). Unlike `logout`, subscribers see `SessionExpired`.
    pub fn invalidate(&self) -> Result<()> {
        let had_session = {
            let mut session = self.write();
            let credential = session.credential.take();
            let user = session.user.take();
            session.generation += 1;
            credential.is_some() || user.is_some()
        };

        self.inner.store.clear()?;

        if had_session {
            warn!("session invalidated by the backend");
            self.inner.events.publish(ClientEvent::SessionExpired);
        }
        Ok(())
    }

    /// Re-read the user from `/auth/me`. On failure the cached user is kept
    /// and the error returned. A response for a session that has since
    /// been replaced or cleared is dropped.
    pub async fn refresh_user(&self) -> Result<Option<SessionUser>> {
        let (credential, generation) = {
            let session = self.read();
            (session.credential.clone(), session.generation)
        };
        let Some(credential) = credential else {
            return Ok(None);
        };

        let me = match self.inner.auth.me(&credential).await {
            Ok(me) => me,
            Err(e) => {
                warn!("failed to refresh user: {}", e);
                return Err(e);
            }
        };

        let user = SessionUser::from(me);
        {
            let mut session = self.write();
            if session.generation != generation {
                debug!("discarding refresh for a superseded session");
                return Ok(session.user.clone());
            }
            session.user = Some(user.clone());
        }

        self.inner.events.publish(ClientEvent::UserRefreshed { user_id: user.id() });
        Ok(Some(user))
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Ack> {
        self.inner.auth.forgot_password(email).await
    }

    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<Ack> {
        self.inner.auth.reset_password(reset_token, password).await
    }

    /// Changes every time a session starts or ends.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn credential(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    /// The credential, or `Unauthenticated` when signed out.
    pub fn require_credential(&self) -> Result<Credential> {
        self.credential().ok_or(ClientError::Unauthenticated)
    }

    pub fn current_user(&self) -> Option<SessionUser> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().user.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.read().loading
    }

    pub fn snapshot(&self) -> AuthState {
        let session = self.read();
        AuthState {
            user: session.user.clone(),
            loading: session.loading,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }
}
