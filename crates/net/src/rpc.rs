//! Remote procedure calls over an opaque transport.
//!
//! [`RpcClient`] owns the auth state (provider, token, ticket) and the
//! claimed position, builds a fresh [`EnvelopeBuilder`] for every call, and
//! runs calls through a [`FailurePolicy`]. Clones share auth and position.

use crate::codec;
use crate::crypto::SignatureEncryptor;
use crate::device::DeviceCharacteristics;
use crate::envelope::{EnvelopeBuilder, SessionSigningState};
use crate::failure::{FailureDecision, FailurePolicy, MAX_RETRIES};
use crate::protocol::{
    AuthTicket, GetPlayerMessage, Request, RequestEnvelope, RequestType, ResponseEnvelope,
    RpcMessage, STATUS_INVALID_AUTH_TOKEN,
};
use async_trait::async_trait;
use pogo_core::AuthProvider;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Failure of the underlying transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The auth provider rejected the login.
    #[error("authentication rejected: {0}")]
    Rejected(String),
    /// A recorded exchange log has no more responses.
    #[error("exchange log exhausted")]
    Exhausted,
    /// A recorded exchange could not be parsed.
    #[error("malformed exchange: {0}")]
    Malformed(String),
    /// I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure of a remote call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Encoding or decoding failure.
    #[error("codec error: {0:#}")]
    Codec(#[from] anyhow::Error),
    /// The server rejected the access token as expired.
    #[error("access token expired")]
    AccessTokenExpired,
    /// The call failed too many times in a row.
    #[error("retries exhausted after {attempts} consecutive failures")]
    RetriesExhausted {
        /// Consecutive failures observed.
        attempts: u32,
    },
    /// No token is held.
    #[error("not authenticated")]
    NotAuthenticated,
    /// The response lacked the return for a sub-request.
    #[error("response missing return for {request:?}")]
    MissingResponse {
        /// Sub-request without a return.
        request: RequestType,
    },
    /// The response broke the envelope's structural limits.
    #[error("invalid response envelope: {0}")]
    InvalidResponse(&'static str),
    /// The server answered with an error status.
    #[error("server returned status {code}")]
    Status {
        /// Status code.
        code: i32,
    },
}

impl ApiError {
    /// Whether the failure policy should count and retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Transport(_)
                | ApiError::Status { .. }
                | ApiError::MissingResponse { .. }
                | ApiError::InvalidResponse(_)
        )
    }
}

/// Result of a call run under the failure policy.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The call completed.
    Completed(T),
    /// The session must re-authenticate, after which the call should be
    /// re-issued.
    ReloginRequired,
}

impl<T> CallOutcome<T> {
    /// Map the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            CallOutcome::Completed(value) => CallOutcome::Completed(f(value)),
            CallOutcome::ReloginRequired => CallOutcome::ReloginRequired,
        }
    }

    /// Map the completed value with a fallible function.
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<CallOutcome<U>, E> {
        match self {
            CallOutcome::Completed(value) => f(value).map(CallOutcome::Completed),
            CallOutcome::ReloginRequired => Ok(CallOutcome::ReloginRequired),
        }
    }
}

/// Opaque login and envelope exchange with the game server.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// Log in with the auth provider; `None` when no token was issued.
    async fn authenticate(
        &self,
        provider: AuthProvider,
        username: &str,
        secret: &str,
    ) -> Result<Option<String>, TransportError>;

    /// Send one signed envelope.
    async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError>;
}

#[async_trait]
impl<T: RpcTransport + ?Sized> RpcTransport for Arc<T> {
    async fn authenticate(
        &self,
        provider: AuthProvider,
        username: &str,
        secret: &str,
    ) -> Result<Option<String>, TransportError> {
        (**self).authenticate(provider, username, secret).await
    }

    async fn send(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, TransportError> {
        (**self).send(envelope).await
    }
}

/// Position claimed in envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignedPosition {
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Altitude.
    pub altitude: f64,
    /// Horizontal accuracy.
    pub accuracy: f64,
}

impl Default for SignedPosition {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            accuracy: 10.0,
        }
    }
}

#[derive(Debug, Default)]
struct AuthState {
    provider: AuthProvider,
    token: Option<String>,
    ticket: Option<AuthTicket>,
}

/// Client for the game's remote procedures.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    device: Arc<dyn DeviceCharacteristics>,
    encryptor: Arc<dyn SignatureEncryptor>,
    signing: SessionSigningState,
    auth: Arc<RwLock<AuthState>>,
    position: Arc<RwLock<SignedPosition>>,
}

impl RpcClient {
    /// Create an unauthenticated client.
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        device: Arc<dyn DeviceCharacteristics>,
        encryptor: Arc<dyn SignatureEncryptor>,
    ) -> Self {
        Self {
            transport,
            device,
            encryptor,
            signing: SessionSigningState::process(),
            auth: Arc::new(RwLock::new(AuthState::default())),
            position: Arc::new(RwLock::new(SignedPosition::default())),
        }
    }

    /// Use a specific signing state instead of the process-wide one.
    pub fn with_signing_state(mut self, signing: SessionSigningState) -> Self {
        self.signing = signing;
        self
    }

    /// Signing state shared by this client's envelopes.
    pub fn signing_state(&self) -> &SessionSigningState {
        &self.signing
    }

    /// Provider of the current login.
    pub async fn provider(&self) -> AuthProvider {
        self.auth.read().await.provider
    }

    /// Current access token.
    pub async fn token(&self) -> Option<String> {
        self.auth.read().await.token.clone()
    }

    /// Whether an auth ticket has been issued.
    pub async fn has_ticket(&self) -> bool {
        self.auth.read().await.ticket.is_some()
    }

    /// Current claimed position.
    pub async fn position(&self) -> SignedPosition {
        *self.position.read().await
    }

    /// Replace the claimed position.
    pub async fn set_position(&self, position: SignedPosition) {
        *self.position.write().await = position;
    }

    /// Log in with the auth provider and open a ticketed session.
    ///
    /// The returned token is stored even when it is `None`, clearing any
    /// stale one.
    pub async fn login(
        &self,
        provider: AuthProvider,
        username: &str,
        secret: &str,
    ) -> Result<Option<String>, ApiError> {
        let token = self.transport.authenticate(provider, username, secret).await?;
        {
            let mut auth = self.auth.write().await;
            auth.provider = provider;
            auth.token = token.clone();
            auth.ticket = None;
        }

        match &token {
            Some(_) => {
                self.open_session().await?;
                info!(%provider, "Logged in");
            }
            None => warn!(%provider, "Auth provider issued no token"),
        }
        Ok(token)
    }

    /// Open a ticketed session with a previously stored token.
    pub async fn resume(&self, provider: AuthProvider, token: String) -> Result<(), ApiError> {
        {
            let mut auth = self.auth.write().await;
            auth.provider = provider;
            auth.token = Some(token);
            auth.ticket = None;
        }
        self.open_session().await?;
        info!(%provider, "Resumed session with stored token");
        Ok(())
    }

    /// Forget token and ticket.
    pub async fn logout(&self) {
        let mut auth = self.auth.write().await;
        auth.token = None;
        auth.ticket = None;
    }

    async fn builder(&self) -> Result<EnvelopeBuilder, ApiError> {
        let (token, provider, ticket) = {
            let auth = self.auth.read().await;
            let token = auth.token.clone().ok_or(ApiError::NotAuthenticated)?;
            (token, auth.provider, auth.ticket.clone())
        };
        let position = self.position().await;
        Ok(EnvelopeBuilder::new(
            token,
            provider,
            position.latitude,
            position.longitude,
            position.accuracy,
            Arc::clone(&self.device),
            Arc::clone(&self.encryptor),
            ticket,
        )
        .with_signing_state(self.signing.clone()))
    }

    async fn open_session(&self) -> Result<(), ApiError> {
        let builder = self.builder().await?;
        let envelope = builder.build_initial_envelope(vec![Request::new(&GetPlayerMessage::default())?])?;
        let response = self.exchange(envelope).await?;
        if response.auth_ticket.is_none() {
            debug!("Initial envelope answered without an auth ticket");
        }
        Ok(())
    }

    async fn exchange(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, ApiError> {
        let expected = envelope.request_types();
        let response = self.transport.send(envelope).await?;

        if response.status_code == STATUS_INVALID_AUTH_TOKEN {
            return Err(ApiError::AccessTokenExpired);
        }
        if !response.is_success() {
            return Err(ApiError::Status {
                code: response.status_code,
            });
        }
        response.verify(expected.len()).map_err(ApiError::InvalidResponse)?;
        if let Some(missing) = expected.get(response.returns.len()) {
            return Err(ApiError::MissingResponse { request: *missing });
        }
        if let Some(ticket) = &response.auth_ticket {
            self.auth.write().await.ticket = Some(ticket.clone());
        }
        Ok(response)
    }

    /// One attempt at a call, without retries.
    pub async fn call(&self, requests: Vec<Request>) -> Result<Vec<Vec<u8>>, ApiError> {
        let envelope = self.builder().await?.build_envelope(requests)?;
        Ok(self.exchange(envelope).await?.returns)
    }

    /// Run a call under the failure policy.
    ///
    /// Transient failures are retried after the policy delay. Every fifth
    /// consecutive failure, and any expired-token answer, yields
    /// [`CallOutcome::ReloginRequired`]. The fiftieth yields
    /// [`ApiError::RetriesExhausted`] and resets the counter.
    pub async fn execute(
        &self,
        policy: &mut FailurePolicy,
        requests: Vec<Request>,
    ) -> Result<CallOutcome<Vec<Vec<u8>>>, ApiError> {
        loop {
            match self.call(requests.clone()).await {
                Ok(returns) => {
                    policy.on_success();
                    return Ok(CallOutcome::Completed(returns));
                }
                Err(ApiError::AccessTokenExpired) => {
                    warn!("Access token expired during call");
                    return Ok(CallOutcome::ReloginRequired);
                }
                Err(err) if err.is_retryable() => {
                    debug!(error = %err, "Remote call failed");
                    match policy.on_failure().await {
                        FailureDecision::Retry => continue,
                        FailureDecision::Reauthenticate => return Ok(CallOutcome::ReloginRequired),
                        FailureDecision::Abort => {
                            policy.reset();
                            return Err(ApiError::RetriesExhausted {
                                attempts: MAX_RETRIES,
                            });
                        }
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Run a single typed message under the failure policy.
    pub async fn execute_single<M: RpcMessage>(
        &self,
        policy: &mut FailurePolicy,
        message: &M,
    ) -> Result<CallOutcome<M::Response>, ApiError> {
        let outcome = self.execute(policy, vec![Request::new(message)?]).await?;
        outcome.try_map(|returns| decode_return(&returns, 0, M::REQUEST_TYPE))
    }
}

/// Decode the return at `index`.
pub fn decode_return<T: DeserializeOwned>(
    returns: &[Vec<u8>],
    index: usize,
    request_type: RequestType,
) -> Result<T, ApiError> {
    let bytes = returns.get(index).ok_or(ApiError::MissingResponse {
        request: request_type,
    })?;
    Ok(codec::decode_return(bytes, request_type)?)
}
