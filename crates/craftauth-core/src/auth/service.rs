//! The authentication service.
//!
//! Owns the current session and reconciles the three ways of getting one:
//! a fresh login with credentials, reuse of the cached last login, and
//! remote validation of a token. All network calls are blocking and happen
//! one at a time; nothing is retried.

use std::path::PathBuf;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::credentials;
use super::session::{Session, SessionHandle, SessionState, SessionStatus};
use crate::api::{HttpTransport, Transport, TransportError};
use crate::cache::{PersistedLogin, PersistenceError, SessionStore};
use crate::config::AuthConfig;
use crate::error::AuthError;

pub struct AuthenticationService<T: Transport = HttpTransport> {
    transport: T,
    store: SessionStore,
    config: AuthConfig,
    state: SessionState,
}

impl AuthenticationService<HttpTransport> {
    /// Create a service talking HTTP to the endpoints in `config`.
    pub fn connect(config: AuthConfig, minecraft_dir: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::new(transport, SessionStore::new(minecraft_dir), config))
    }
}

impl<T: Transport> AuthenticationService<T> {
    pub fn new(transport: T, store: SessionStore, config: AuthConfig) -> Self {
        Self {
            transport,
            store,
            config,
            state: SessionState::Unauthenticated,
        }
    }

    // ===== Login =====

    /// Exchange username and password for a session.
    ///
    /// On success the session is cached to disk and its handle returned.
    /// A blank username is sent as `null`.
    pub fn login_with_credentials(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<SessionHandle, AuthError> {
        self.state = SessionState::Authenticating;

        let username = Some(username.trim())
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let body = self.authenticate_body(username.as_deref(), password);
        let url = self.config.authenticate_url.as_str();

        let raw_response = match self.transport.post(url, &body) {
            Ok(text) => text,
            Err(e) => {
                error!(endpoint = url, error = %e, "Login failed");
                self.state = SessionState::Unauthenticated;
                return Err(e.into());
            }
        };

        let credentials = match credentials::parse(&raw_response) {
            Ok(credentials) => credentials,
            Err(e) => {
                error!(
                    endpoint = url,
                    len = raw_response.len(),
                    error = %e,
                    "Login failed"
                );
                self.state = SessionState::Unauthenticated;
                return Err(e.into());
            }
        };

        let session = Session::Fresh {
            raw_response,
            credentials,
            username,
        };
        let handle = session.handle();
        info!(profile = session.display_name(), "Session created");

        self.persist(&session);
        self.state = SessionState::Authenticated(session);
        Ok(handle)
    }

    fn authenticate_body(&self, username: Option<&str>, password: &str) -> String {
        let mut body = json!({
            "agent": {
                "name": self.config.agent_name,
                "version": self.config.agent_version,
            },
            "username": username,
            "password": password,
        });
        if let (Some(token), Value::Object(map)) = (&self.config.client_token, &mut body) {
            map.insert("clientToken".to_string(), Value::String(token.clone()));
        }
        body.to_string()
    }

    // ===== Restore =====

    /// Reuse a cached login after checking its access token with the server.
    ///
    /// A rejected token leaves the service `Invalid`. The cached file is not
    /// touched in that case; removing it is up to `logout`.
    pub fn restore_from_cache(&mut self, record: PersistedLogin) -> Result<SessionHandle, AuthError> {
        self.state = SessionState::Authenticating;

        if let Err(e) = self.check_token(&record.access_token) {
            error!(
                endpoint = self.config.validate_url.as_str(),
                error = %e,
                "Login with saved session failed"
            );
            self.state = SessionState::Invalid;
            return Err(AuthError::ValidationFailure(e));
        }

        let session = Session::Cached { record };
        let handle = session.handle();
        info!(profile = session.display_name(), "Login with saved session successful");

        self.persist(&session);
        self.state = SessionState::Authenticated(session);
        Ok(handle)
    }

    /// Restore from whatever is cached on disk.
    ///
    /// A missing or unreadable record means there is no prior session and
    /// yields `Ok(None)`.
    pub fn restore_last_login(&mut self) -> Result<Option<SessionHandle>, AuthError> {
        let record = match self.store.read() {
            Ok(record) => record,
            Err(PersistenceError::NotFound(path)) => {
                debug!(path = %path.display(), "No saved login");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable saved login");
                return Ok(None);
            }
        };

        self.restore_from_cache(record).map(Some)
    }

    /// Controller entry point.
    ///
    /// Tries the cached login first unless `force_login` is set, then falls
    /// back to the given credentials. Without a password there is nothing
    /// to fall back to and the restore outcome is returned as is.
    pub fn authenticate(
        &mut self,
        username: Option<&str>,
        password: Option<&str>,
        force_login: bool,
    ) -> Result<SessionHandle, AuthError> {
        let restore_error = if force_login {
            debug!("Forced login, skipping saved session");
            None
        } else {
            match self.restore_last_login() {
                Ok(Some(handle)) => return Ok(handle),
                Ok(None) => None,
                Err(e) => Some(e),
            }
        };

        match (password, restore_error) {
            (Some(password), _) => self.login_with_credentials(username.unwrap_or_default(), password),
            (None, Some(e)) => Err(e),
            (None, None) => Err(AuthError::NotAuthenticated),
        }
    }

    // ===== Logout =====

    /// Forget the current session and remove the cached record.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        if let SessionState::Authenticated(ref session) = self.state {
            info!(profile = session.display_name(), "Logging out");
        }
        self.state = SessionState::Unauthenticated;
        self.store.delete()?;
        Ok(())
    }

    // ===== Validation =====

    /// Ask the server whether an access token is still valid.
    ///
    /// Stateless; the current session is not affected.
    pub fn validate(&self, access_token: &str) -> bool {
        match self.check_token(access_token) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Access token not valid");
                false
            }
        }
    }

    fn check_token(&self, access_token: &str) -> Result<(), TransportError> {
        let body = json!({ "accessToken": access_token }).to_string();
        self.transport
            .post(&self.config.validate_url, &body)
            .map(|_| ())
    }

    // ===== Accessors =====

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match self.state {
            SessionState::Authenticated(ref session) => Some(session),
            _ => None,
        }
    }

    pub fn session_handle(&self) -> Option<SessionHandle> {
        self.session().map(Session::handle)
    }

    pub fn read_last_login(&self) -> Result<PersistedLogin, PersistenceError> {
        self.store.read()
    }

    /// Remove the cached record without touching the in-memory session.
    pub fn delete_last_login(&self) -> Result<bool, PersistenceError> {
        info!(path = %self.store.path().display(), "Deleting last login");
        self.store.delete()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Cache failures never undo a successful login.
    fn persist(&self, session: &Session) {
        match self.store.save(&session.to_persisted()) {
            Ok(()) => debug!("Saved session to last login"),
            Err(e) => warn!(error = %e, "Failed to save last login"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use tempfile::TempDir;

    use crate::config::{AUTHENTICATE_URL, VALIDATE_URL};

    const SCENARIO_A_RESPONSE: &str =
        r#"{"accessToken":"AT1","clientToken":"CT1","selectedProfile":{"id":"P1","name":"Steve"}}"#;

    #[derive(Clone, Copy)]
    enum Reply {
        Body(&'static str),
        Reject,
        Offline,
    }

    struct StubTransport {
        authenticate: Reply,
        validate: Reply,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl StubTransport {
        fn new(authenticate: Reply, validate: Reply) -> Self {
            Self {
                authenticate,
                validate,
                calls: RefCell::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.calls.borrow().iter().map(|(url, _)| url.clone()).collect()
        }

        fn last_body(&self) -> Value {
            let calls = self.calls.borrow();
            let (_, body) = calls.last().expect("no calls recorded");
            serde_json::from_str(body).expect("request body is JSON")
        }
    }

    impl Transport for StubTransport {
        fn post(&self, url: &str, body: &str) -> Result<String, TransportError> {
            self.calls.borrow_mut().push((url.to_string(), body.to_string()));
            let reply = if url == AUTHENTICATE_URL {
                self.authenticate
            } else if url == VALIDATE_URL {
                self.validate
            } else {
                panic!("unexpected url {}", url);
            };
            match reply {
                Reply::Body(text) => Ok(text.to_string()),
                Reply::Reject => Err(TransportError::Rejected {
                    error: "ForbiddenOperationException".to_string(),
                    message: "Invalid token".to_string(),
                }),
                Reply::Offline => Err(TransportError::ServerError("unavailable".to_string())),
            }
        }
    }

    fn service<'a>(stub: &'a StubTransport, dir: &TempDir) -> AuthenticationService<&'a StubTransport> {
        AuthenticationService::new(stub, SessionStore::new(dir.path()), AuthConfig::default())
    }

    fn cached_record() -> PersistedLogin {
        PersistedLogin {
            username: Some("old@b.com".to_string()),
            display_name: "Alex".to_string(),
            access_token: "AT0".to_string(),
            client_token: "CT0".to_string(),
            profile_id: "P0".to_string(),
        }
    }

    #[test]
    fn test_login_with_credentials() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let handle = svc.login_with_credentials("a@b.com", "pw").unwrap();
        assert_eq!(handle.as_str(), "token:AT1:P1");
        assert_eq!(svc.status(), SessionStatus::Authenticated);
        assert_eq!(svc.session_handle(), Some(handle));

        let session = svc.session().unwrap();
        assert_eq!(session.display_name(), "Steve");
        assert_eq!(session.client_token(), "CT1");
        assert_eq!(session.raw_response(), Some(SCENARIO_A_RESPONSE));

        let record = svc.read_last_login().unwrap();
        assert_eq!(
            record,
            PersistedLogin {
                username: Some("a@b.com".to_string()),
                display_name: "Steve".to_string(),
                access_token: "AT1".to_string(),
                client_token: "CT1".to_string(),
                profile_id: "P1".to_string(),
            }
        );
    }

    #[test]
    fn test_login_request_body() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);
        svc.login_with_credentials("a@b.com", "pw").unwrap();

        assert_eq!(stub.urls(), vec![AUTHENTICATE_URL.to_string()]);
        assert_eq!(
            stub.last_body(),
            json!({
                "agent": {"name": "Minecraft", "version": 1},
                "username": "a@b.com",
                "password": "pw",
            })
        );
    }

    #[test]
    fn test_login_sends_configured_client_token() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let config = AuthConfig {
            client_token: Some("install-token".to_string()),
            ..AuthConfig::default()
        };
        let mut svc = AuthenticationService::new(&stub, SessionStore::new(dir.path()), config);

        svc.login_with_credentials("  ", "pw").unwrap();
        let body = stub.last_body();
        assert_eq!(body["clientToken"], "install-token");
        assert!(body["username"].is_null());
        assert_eq!(svc.session().unwrap().username(), None);
    }

    #[test]
    fn test_login_empty_response_keeps_prior_record() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&cached_record()).unwrap();

        let stub = StubTransport::new(Reply::Body(""), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let err = svc.login_with_credentials("a@b.com", "pw").unwrap_err();
        assert!(matches!(err, AuthError::Parse(credentials::ParseError::Empty)));
        assert_eq!(svc.status(), SessionStatus::Unauthenticated);
        assert!(svc.session_handle().is_none());
        assert_eq!(store.read().unwrap(), cached_record());
    }

    #[test]
    fn test_login_rejected_credentials() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Reject, Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let err = svc.login_with_credentials("a@b.com", "wrong").unwrap_err();
        assert_eq!(err.user_message(), "Invalid token");
        assert_eq!(svc.status(), SessionStatus::Unauthenticated);
        assert!(!svc.store().exists());
    }

    #[test]
    fn test_login_partial_response_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(
            Reply::Body(r#"{"accessToken":"AT1","clientToken":"CT1"}"#),
            Reply::Body(""),
        );
        let mut svc = service(&stub, &dir);

        let err = svc.login_with_credentials("a@b.com", "pw").unwrap_err();
        assert!(matches!(err, AuthError::Parse(credentials::ParseError::Schema(_))));
        assert!(svc.session().is_none());
        assert!(!svc.store().exists());
    }

    #[test]
    fn test_restore_from_cache_valid_token() {
        let dir = TempDir::new().unwrap();
        // An authenticate reply that would not parse proves the parser is never consulted.
        let stub = StubTransport::new(Reply::Body("not json"), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let handle = svc.restore_from_cache(cached_record()).unwrap();
        assert_eq!(handle.as_str(), "token:AT0:P0");
        assert_eq!(stub.urls(), vec![VALIDATE_URL.to_string()]);
        assert_eq!(stub.last_body(), json!({"accessToken": "AT0"}));

        let session = svc.session().unwrap();
        assert!(session.is_restored());
        assert_eq!(session.username(), Some("old@b.com"));
        assert_eq!(session.display_name(), "Alex");
        assert_eq!(svc.read_last_login().unwrap(), cached_record());
    }

    #[test]
    fn test_restore_from_cache_rejected_token() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&cached_record()).unwrap();

        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Reject);
        let mut svc = service(&stub, &dir);

        let err = svc.restore_from_cache(cached_record()).unwrap_err();
        assert!(matches!(err, AuthError::ValidationFailure(_)));
        assert_eq!(svc.status(), SessionStatus::Invalid);
        assert!(svc.session_handle().is_none());
        assert_eq!(store.read().unwrap(), cached_record());
    }

    #[test]
    fn test_logout_after_login() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);
        svc.login_with_credentials("a@b.com", "pw").unwrap();

        svc.logout().unwrap();
        assert_eq!(svc.status(), SessionStatus::Unauthenticated);
        assert!(svc.session().is_none());
        assert!(matches!(svc.read_last_login(), Err(PersistenceError::NotFound(_))));

        // Nothing left to delete.
        svc.logout().unwrap();
        assert!(!svc.delete_last_login().unwrap());
    }

    #[test]
    fn test_validate_is_stateless() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        assert!(svc.validate("AT1"));
        assert!(svc.validate("AT1"));
        assert_eq!(svc.status(), SessionStatus::Unauthenticated);

        svc.login_with_credentials("a@b.com", "pw").unwrap();
        let rejecting = StubTransport::new(Reply::Body(""), Reply::Reject);
        let checker = service(&rejecting, &dir);
        assert!(!checker.validate("AT1"));
        assert_eq!(svc.status(), SessionStatus::Authenticated);
    }

    #[test]
    fn test_restore_last_login_without_record() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        assert_eq!(svc.restore_last_login().unwrap(), None);
        assert!(stub.urls().is_empty());
    }

    #[test]
    fn test_restore_last_login_malformed_record() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);
        std::fs::write(svc.store().path(), "{ broken").unwrap();

        assert_eq!(svc.restore_last_login().unwrap(), None);
        assert_eq!(svc.status(), SessionStatus::Unauthenticated);
        assert_eq!(std::fs::read_to_string(svc.store().path()).unwrap(), "{ broken");
    }

    #[test]
    fn test_authenticate_prefers_cached_login() {
        let dir = TempDir::new().unwrap();
        SessionStore::new(dir.path()).save(&cached_record()).unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let handle = svc.authenticate(Some("a@b.com"), Some("pw"), false).unwrap();
        assert_eq!(handle.as_str(), "token:AT0:P0");
        assert_eq!(stub.urls(), vec![VALIDATE_URL.to_string()]);
    }

    #[test]
    fn test_authenticate_force_login_skips_cache() {
        let dir = TempDir::new().unwrap();
        SessionStore::new(dir.path()).save(&cached_record()).unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Body(""));
        let mut svc = service(&stub, &dir);

        let handle = svc.authenticate(Some("a@b.com"), Some("pw"), true).unwrap();
        assert_eq!(handle.as_str(), "token:AT1:P1");
        assert_eq!(stub.urls(), vec![AUTHENTICATE_URL.to_string()]);
        assert_eq!(svc.read_last_login().unwrap().access_token, "AT1");
    }

    #[test]
    fn test_authenticate_falls_back_to_credentials() {
        let dir = TempDir::new().unwrap();
        SessionStore::new(dir.path()).save(&cached_record()).unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Offline);
        let mut svc = service(&stub, &dir);

        let handle = svc.authenticate(Some("a@b.com"), Some("pw"), false).unwrap();
        assert_eq!(handle.as_str(), "token:AT1:P1");
        assert_eq!(
            stub.urls(),
            vec![VALIDATE_URL.to_string(), AUTHENTICATE_URL.to_string()]
        );
    }

    #[test]
    fn test_authenticate_without_password() {
        let dir = TempDir::new().unwrap();
        let stub = StubTransport::new(Reply::Body(SCENARIO_A_RESPONSE), Reply::Reject);
        let mut svc = service(&stub, &dir);
        assert!(matches!(
            svc.authenticate(Some("a@b.com"), None, false),
            Err(AuthError::NotAuthenticated)
        ));

        SessionStore::new(dir.path()).save(&cached_record()).unwrap();
        assert!(matches!(
            svc.authenticate(None, None, false),
            Err(AuthError::ValidationFailure(_))
        ));
        assert_eq!(svc.status(), SessionStatus::Invalid);
    }
}
