use crate::gateway::GatewayError;
use agora_common::model::{Id, post::PostMarker};
use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Raised before any network call; the caller should route to an auth
    /// prompt instead of retrying.
    #[error("The operation requires a signed-in user")]
    SignedOut,
    /// Raised before any network call; vote intents only make sense against
    /// a post that is resident in some cache.
    #[error("Post with id {0} is not resident in any cache")]
    PostNotCached(Id<PostMarker>),
    #[error("Only the creator of post {0} may delete it")]
    NotPostCreator(Id<PostMarker>),
    #[error("The requested object was not found")]
    NotFound,
    #[error("The request conflicted with existing state")]
    Conflict,
    #[error(transparent)]
    Network(GatewayError),
}

impl From<GatewayError> for ClientError {
    fn from(err: GatewayError) -> Self {
        match err.status() {
            Some(StatusCode::NOT_FOUND) => ClientError::NotFound,
            Some(StatusCode::CONFLICT) => ClientError::Conflict,
            _ => ClientError::Network(err),
        }
    }
}
