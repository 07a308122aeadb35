//! Session-level errors.

use crate::cache::CacheError;
use crate::credentials::CredentialError;
use pogo_core::PokemonId;
use pogo_net::ApiError;
use thiserror::Error;

/// Errors surfaced by [`crate::SessionManager`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Logging in again with the stored credentials yielded no token.
    #[error("relogin with stored credentials failed")]
    ReloginFailed,
    /// The inventory held no player stats entry.
    #[error("inventory carries no player stats")]
    MissingPlayerStats,
    /// The server answered a settings download without settings.
    #[error("server returned no global settings")]
    MissingSettings,
    /// No species settings for a creature.
    #[error("no settings for pokemon {0:?}")]
    UnknownPokemon(PokemonId),
    /// No used incubator holds an egg.
    #[error("no incubator holds egg {egg_id}")]
    IncubatorNotFound {
        /// Egg instance id.
        egg_id: u64,
    },
    /// The templates carry no upgrade settings.
    #[error("item templates carry no upgrade settings")]
    MissingUpgradeTemplate,
    /// Nothing to log in with.
    #[error("no stored credentials")]
    NoStoredCredentials,
    /// The operation needs a logged-in session.
    #[error("not logged in")]
    NotLoggedIn,
    /// Cache failure.
    #[error(transparent)]
    Cache(#[from] CacheError),
    /// Credential store failure.
    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

impl SessionError {
    /// Whether the error came from the auth layer rather than the data.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            SessionError::ReloginFailed
                | SessionError::NoStoredCredentials
                | SessionError::NotLoggedIn
                | SessionError::Api(ApiError::AccessTokenExpired)
                | SessionError::Api(ApiError::NotAuthenticated)
        )
    }
}
