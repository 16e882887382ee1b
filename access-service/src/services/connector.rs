//! Login state machine.
//!
//! Every login walks the same ordered checks and the first failure
//! short-circuits with its typed error: required fields, credential,
//! disabled flag, host allow-list, delegation, tier. Nothing is cached
//! for a failed attempt. A successful login either reuses a live
//! session with the same identity tuple or mints a fresh token.

use std::sync::Arc;

use tracing::instrument;

use crate::models::{Locale, ServerId, UserId};
use crate::services::classifier::{AccessTier, AccountClassifier};
use crate::services::error::AccessError;
use crate::services::hierarchy::AccountHierarchy;
use crate::services::session::{Session, SessionCache, SessionKey, SessionToken};
use crate::utils::{verify_credential, Credential, CredentialHash};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    /// Identity the session will act as.
    pub connect_as: UserId,
    /// Identity whose credential is presented.
    pub authenticate_as: UserId,
    pub credential: Credential,
    pub locale: Locale,
    /// Restrict the session to one server, for operators that want a
    /// narrower blast radius than their grants allow.
    pub server_scope: Option<ServerId>,
    pub read_only: bool,
}

impl LoginRequest {
    /// Plain login: connect as the identity being authenticated.
    pub fn direct(username: UserId, credential: Credential) -> Self {
        Self {
            connect_as: username.clone(),
            authenticate_as: username,
            credential,
            locale: Locale::default(),
            server_scope: None,
            read_only: false,
        }
    }
}

pub struct ConnectorService {
    classifier: Arc<AccountClassifier>,
    hierarchy: Arc<AccountHierarchy>,
    sessions: Arc<SessionCache>,
}

impl ConnectorService {
    pub fn new(
        classifier: Arc<AccountClassifier>,
        hierarchy: Arc<AccountHierarchy>,
        sessions: Arc<SessionCache>,
    ) -> Self {
        Self {
            classifier,
            hierarchy,
            sessions,
        }
    }

    /// Authenticate and establish a session.
    ///
    /// The credential is verified on every call, even when a cached
    /// session ends up being reused. The disabled check runs after the
    /// credential check so a correct credential on a disabled identity
    /// reports the disabled state rather than a credential failure.
    #[instrument(
        skip(self, req),
        fields(
            connect_as = %req.connect_as,
            authenticate_as = %req.authenticate_as,
            host = origin_host,
        )
    )]
    pub async fn login(
        &self,
        origin_host: &str,
        req: LoginRequest,
    ) -> Result<Arc<Session>, AccessError> {
        if req.connect_as.is_empty() || req.authenticate_as.is_empty() || req.credential.is_empty()
        {
            return Err(AccessError::IncompleteLogin);
        }

        let authenticator = self
            .classifier
            .administrator(&req.authenticate_as)
            .await?
            .ok_or(AccessError::AccountNotFound)?;
        let stored = authenticator
            .credential_hash
            .clone()
            .map(CredentialHash::new)
            .ok_or(AccessError::AccountNotFound)?;

        if verify_credential(&req.credential, &stored).is_err() {
            tracing::warn!(user = %req.authenticate_as, "credential rejected");
            return Err(AccessError::BadCredential);
        }

        if !authenticator.is_enabled() {
            tracing::warn!(user = %req.authenticate_as, "login on disabled identity");
            return Err(AccessError::AccountDisabled);
        }

        let host = origin_host.to_lowercase();
        if let Some(allowed) = self.classifier.allowed_hosts(&req.authenticate_as).await? {
            if !allowed.contains(&host) {
                tracing::warn!(user = %req.authenticate_as, host = %host, "login from unlisted host");
                return Err(AccessError::HostNotAllowed(host));
            }
        }

        let subject = if req.connect_as != req.authenticate_as {
            self.check_delegation(&authenticator, &req).await?
        } else {
            authenticator
        };

        let tier = self.classifier.classify(&req.connect_as).await?;
        if tier == AccessTier::Disabled {
            return Err(AccessError::AccountDisabled);
        }

        let key = SessionKey {
            connect_as: req.connect_as.clone(),
            authenticate_as: req.authenticate_as.clone(),
            server_scope: req.server_scope.clone(),
            read_only: req.read_only,
        };
        if let Some(existing) = self.sessions.find_by_key(&key) {
            existing.set_locale(req.locale);
            tracing::info!(user = %req.connect_as, "live session reused");
            return Ok(existing);
        }

        let session = Arc::new(Session::new(
            SessionToken::generate(),
            req.connect_as,
            req.authenticate_as,
            subject.account_id,
            tier,
            req.server_scope,
            req.read_only,
            req.locale,
        ));
        self.sessions.insert(session.clone());
        tracing::info!(
            user = %session.connect_as(),
            tier = tier.as_str(),
            read_only = session.is_read_only(),
            "session established"
        );
        Ok(session)
    }

    pub fn find_session(&self, token: &SessionToken) -> Option<Arc<Session>> {
        self.sessions.find(token)
    }

    /// Drop a session. Returns false when the token was not live.
    pub fn logout(&self, token: &SessionToken) -> bool {
        match self.sessions.remove(token) {
            Some(session) => {
                tracing::info!(user = %session.connect_as(), "session ended");
                true
            }
            None => false,
        }
    }

    /// Delegation rules: the authenticator must have delegation
    /// enabled, the two accounts must differ, and the target account
    /// must sit under the authenticator's account. The target identity
    /// must exist and be enabled.
    async fn check_delegation(
        &self,
        authenticator: &crate::models::Administrator,
        req: &LoginRequest,
    ) -> Result<crate::models::Administrator, AccessError> {
        let delegate = self
            .classifier
            .administrator(&req.connect_as)
            .await?
            .ok_or(AccessError::AccountNotFound)?;

        let refused = || AccessError::DelegationNotAllowed {
            authenticate_as: req.authenticate_as.clone(),
            connect_as: req.connect_as.clone(),
        };

        if !authenticator.can_delegate_flag {
            return Err(refused());
        }
        if delegate.account_id == authenticator.account_id {
            return Err(refused());
        }
        if !self
            .hierarchy
            .is_ancestor_or_self(&authenticator.account_id, &delegate.account_id)
            .await?
        {
            return Err(refused());
        }
        if !delegate.is_enabled() {
            return Err(AccessError::AccountDisabled);
        }

        tracing::info!(
            authenticate_as = %req.authenticate_as,
            connect_as = %req.connect_as,
            "delegated login accepted"
        );
        Ok(delegate)
    }
}
