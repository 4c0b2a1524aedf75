use crate::model::{
    Id, community::CommunityMarker, user::UserMarker, vote::VoteValue,
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 300;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post as served by the listing endpoints.
///
/// `net_score` is never stored server-side; it is derived from the vote
/// ledger on every read. Client-held copies are cached projections of that
/// derivation, reconciled after each confirmed mutation.
/// `current_user_vote` is only present when the listing call was made with a
/// viewer id.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub community_id: Id<CommunityMarker>,
    pub creator_id: Id<UserMarker>,
    pub title: PostTitle,
    pub body: String,
    pub number_of_comments: i32,
    pub net_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user_vote: Option<VoteValue>,
    #[serde(with = "crate::util::rfc3339")]
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub community_id: Id<CommunityMarker>,
    pub creator_id: Id<UserMarker>,
    pub title: PostTitle,
    #[serde(default)]
    pub body: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostTitle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The post title is invalid: {0}")]
pub struct InvalidPostTitleError(String);

impl PostTitle {
    pub fn new(title: String) -> Result<Self, InvalidPostTitleError> {
        if !title.is_empty() && title.chars().count() <= POST_TITLE_MAX_LEN {
            Ok(PostTitle(title))
        } else {
            Err(InvalidPostTitleError(title))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for PostTitle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        PostTitle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"PostTitle"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::post::{POST_TITLE_MAX_LEN, PostTitle};

    #[test]
    fn title_bounds() {
        assert!(PostTitle::new(String::new()).is_err());
        assert!(PostTitle::new("a".repeat(POST_TITLE_MAX_LEN)).is_ok());
        assert!(PostTitle::new("a".repeat(POST_TITLE_MAX_LEN + 1)).is_err());
    }
}
