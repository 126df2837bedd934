//! Authenticated identity held by the app
//!
//! Wraps an [`ApiClient`] and keeps the signed-in profile in memory. The
//! persisted token is the source of truth for the request pipeline; this
//! state mirrors it for callers and is reset when the client invalidates the
//! session after a 401.

use crate::api::{cliente, ApiClient, ApiError, Profile, ProfileUpdate, RegisterRequest};
use crate::validation;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub authenticated: bool,
    pub profile: Option<Profile>,
}

pub struct AuthSession {
    client: Arc<ApiClient>,
    state: Arc<RwLock<SessionState>>,
}

impl AuthSession {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let state = Arc::new(RwLock::new(SessionState::default()));

        let on_expired = state.clone();
        client.session_guard().on_invalidated(move || {
            let mut state = on_expired.write().unwrap_or_else(|e| e.into_inner());
            *state = SessionState::default();
        });

        Self { client, state }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn state(&self) -> SessionState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }

    pub fn current_profile(&self) -> Option<Profile> {
        self.state().profile
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn set_profile(&self, profile: Profile) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.profile = Some(profile);
    }

    /// Pick up a session persisted by a previous run. Best effort: any
    /// storage problem leaves the session signed out.
    pub fn restore(&self) -> bool {
        let storage = self.client.storage();

        let token = match storage.usable_token() {
            Ok(token) => token,
            Err(e) => {
                log::warn!("Could not read stored token, starting signed out: {}", e);
                None
            }
        };
        let profile = match storage.profile() {
            Ok(profile) => profile,
            Err(e) => {
                log::warn!("Could not read stored profile, starting signed out: {}", e);
                None
            }
        };

        match (token, profile) {
            (Some(_), Some(profile)) => {
                log::info!("Restored session for client {}", profile.id);
                self.set_state(SessionState {
                    authenticated: true,
                    profile: Some(profile),
                });
                true
            }
            (None, None) => {
                self.set_state(SessionState::default());
                false
            }
            _ => {
                log::warn!("Stored session is incomplete, discarding it");
                if let Err(e) = storage.clear() {
                    log::warn!("Could not clear incomplete session: {}", e);
                }
                self.set_state(SessionState::default());
                false
            }
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Profile, ApiError> {
        validation::check_login(email, password)?;

        let data = cliente::login(&self.client, email.trim(), password).await?;
        self.establish(&data.token, data.cliente).await?;
        log::info!("Signed in");
        Ok(self.current_profile().unwrap_or_default())
    }

    /// Create an account and sign in with it. When the registration response
    /// carries no session, a regular login with the same credentials follows.
    pub async fn register(&self, request: RegisterRequest) -> Result<Profile, ApiError> {
        validation::check_registration(&request)?;

        match cliente::register(&self.client, &request).await? {
            Some(data) => {
                self.establish(&data.token, data.cliente).await?;
                log::info!("Registered and signed in");
                Ok(self.current_profile().unwrap_or_default())
            }
            None => {
                log::info!("Registered, signing in");
                self.login(&request.email, &request.contrasena).await
            }
        }
    }

    async fn establish(&self, token: &str, profile: Profile) -> Result<(), ApiError> {
        self.client.session_guard().begin_session().await;
        let storage = self.client.storage();
        storage.save_token(token)?;
        storage.save_profile(&profile)?;
        self.set_state(SessionState {
            authenticated: true,
            profile: Some(profile),
        });
        Ok(())
    }

    /// Sign out. The server is told when reachable; local state is dropped
    /// regardless.
    pub async fn logout(&self) -> Result<(), ApiError> {
        if self.client.storage().has_stored_session() {
            if let Err(e) = cliente::logout(&self.client).await {
                log::warn!("Logout request failed, clearing local session anyway: {}", e);
            }
        }

        self.client.session_guard().begin_session().await;
        let cleared = self.client.storage().clear();
        self.set_state(SessionState::default());
        cleared?;
        log::info!("Signed out");
        Ok(())
    }

    pub async fn refresh_profile(&self) -> Result<Profile, ApiError> {
        let profile = cliente::get_profile(&self.client).await?;
        self.remember(profile.clone());
        Ok(profile)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        validation::check_profile_update(update)?;
        let profile = cliente::update_profile(&self.client, update).await?;
        self.remember(profile.clone());
        Ok(profile)
    }

    pub async fn change_password(&self, current: &str, new_password: &str) -> Result<(), ApiError> {
        validation::check_new_password(current, new_password)?;
        cliente::change_password(&self.client, current, new_password).await
    }

    pub async fn update_photo(
        &self,
        bytes: Vec<u8>,
        file_name: Option<&str>,
        mime: Option<&str>,
    ) -> Result<Profile, ApiError> {
        let photo = cliente::update_photo(&self.client, bytes, file_name, mime).await?;
        let mut profile = self.current_profile().unwrap_or_default();
        profile.foto_perfil = photo.foto_perfil;
        profile.foto_perfil_url = photo.foto_perfil_url;
        self.remember(profile.clone());
        Ok(profile)
    }

    pub async fn delete_photo(&self) -> Result<Profile, ApiError> {
        cliente::delete_photo(&self.client).await?;
        let mut profile = self.current_profile().unwrap_or_default();
        profile.foto_perfil = None;
        profile.foto_perfil_url = None;
        self.remember(profile.clone());
        Ok(profile)
    }

    // Keep the stored snapshot in step; a failed write only costs us the
    // cached copy on the next start.
    fn remember(&self, profile: Profile) {
        if let Err(e) = self.client.storage().save_profile(&profile) {
            log::warn!("Could not store profile snapshot: {}", e);
        }
        self.set_profile(profile);
    }
}
