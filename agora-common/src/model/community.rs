use crate::model::{Id, user::UserMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const COMMUNITY_NAME_MAX_LEN: usize = 64;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommunityMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: Id<CommunityMarker>,
    pub name: CommunityName,
    pub creator_id: Id<UserMarker>,
    pub number_of_members: i64,
    #[serde(with = "crate::util::rfc3339")]
    pub created_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommunity {
    pub name: CommunityName,
    pub creator_id: Id<UserMarker>,
}

/// One user's membership in one community, as listed for the feed composer.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub community_id: Id<CommunityMarker>,
    pub user_id: Id<UserMarker>,
    pub is_moderator: bool,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommunityName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The community name is invalid: {0}")]
pub struct InvalidCommunityNameError(String);

impl CommunityName {
    pub fn new(name: String) -> Result<Self, InvalidCommunityNameError> {
        if !name.is_empty() && name.chars().count() <= COMMUNITY_NAME_MAX_LEN {
            Ok(CommunityName(name))
        } else {
            Err(InvalidCommunityNameError(name))
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

impl<'de> Deserialize<'de> for CommunityName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommunityName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CommunityName"))
    }
}
