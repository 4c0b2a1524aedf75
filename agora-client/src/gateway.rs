use agora_common::model::{
    Acknowledged, Id,
    community::{CommunityMarker, Membership},
    post::{Post, PostMarker},
    user::UserMarker,
    vote::{CastVote, VoteReceipt, VoteValue},
};
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub type Result<T, E = GatewayError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Server replied with status {0}")]
    Status(StatusCode),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Transport(err) => err.status(),
            GatewayError::Status(status) => Some(*status),
        }
    }
}

/// The server operations the client core depends on. Faked in tests.
#[async_trait]
pub trait PostGateway {
    async fn list_posts(
        &self,
        community_id: Option<Id<CommunityMarker>>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Vec<Post>>;

    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Post>;

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()>;

    async fn cast_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        value: VoteValue,
    ) -> Result<VoteReceipt>;

    async fn retract_vote(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()>;

    async fn joined_communities(&self, user_id: Id<UserMarker>) -> Result<Vec<Membership>>;
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("The base URL cannot carry path segments: {0}")]
pub struct InvalidBaseUrlError(Url);

/// [`PostGateway`] over the REST surface of the server.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    base: Url,
    http: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base: Url) -> Result<Self, InvalidBaseUrlError> {
        if base.cannot_be_a_base() {
            return Err(InvalidBaseUrlError(base));
        }

        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .expect("Base URL was validated at construction.")
            .extend(segments);
        url
    }

    fn checked(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(GatewayError::Status(status))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = Self::checked(self.http.get(url).send().await?)?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PostGateway for HttpGateway {
    async fn list_posts(
        &self,
        community_id: Option<Id<CommunityMarker>>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Vec<Post>> {
        let mut url = self.endpoint(&["posts"]);
        {
            let mut query = url.query_pairs_mut();
            if let Some(community_id) = community_id {
                query.append_pair("communityId", &community_id.to_string());
            }
            if let Some(viewer) = viewer {
                query.append_pair("userId", &viewer.to_string());
            }
        }

        self.get_json(url).await
    }

    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Post> {
        let mut url = self.endpoint(&["posts", &post_id.to_string()]);
        if let Some(viewer) = viewer {
            url.query_pairs_mut()
                .append_pair("userId", &viewer.to_string());
        }

        self.get_json(url).await
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        let url = self.endpoint(&["posts", &post_id.to_string()]);
        let response = Self::checked(self.http.delete(url).send().await?)?;
        let _: Acknowledged = response.json().await?;

        Ok(())
    }

    async fn cast_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        value: VoteValue,
    ) -> Result<VoteReceipt> {
        let url = self.endpoint(&["votes"]);
        let cast = CastVote {
            post_id,
            user_id,
            value,
        };

        let response = Self::checked(self.http.post(url).json(&cast).send().await?)?;
        Ok(response.json().await?)
    }

    async fn retract_vote(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        let mut url = self.endpoint(&["votes"]);
        url.query_pairs_mut()
            .append_pair("postId", &post_id.to_string())
            .append_pair("userId", &user_id.to_string());

        let response = Self::checked(self.http.delete(url).send().await?)?;
        let _: Acknowledged = response.json().await?;

        Ok(())
    }

    async fn joined_communities(&self, user_id: Id<UserMarker>) -> Result<Vec<Membership>> {
        let url = self.endpoint(&["users", &user_id.to_string(), "communities"]);

        self.get_json(url).await
    }
}
