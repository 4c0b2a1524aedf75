use crate::model::{Id, post::PostMarker, user::UserMarker};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct VoteMarker;

/// A single user's stance on a post. There is no neutral variant; "no vote"
/// is the absence of a ledger row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum VoteValue {
    Down,
    Up,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The vote value must be -1 or 1, got {0}")]
pub struct InvalidVoteValueError(i16);

impl VoteValue {
    #[must_use]
    pub fn as_i16(self) -> i16 {
        match self {
            VoteValue::Down => -1,
            VoteValue::Up => 1,
        }
    }

    /// Contribution of this vote to a post's net score.
    #[must_use]
    pub fn score(self) -> i64 {
        i64::from(self.as_i16())
    }
}

impl TryFrom<i16> for VoteValue {
    type Error = InvalidVoteValueError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VoteValue::Down),
            1 => Ok(VoteValue::Up),
            other => Err(InvalidVoteValueError(other)),
        }
    }
}

impl Serialize for VoteValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i16(self.as_i16())
    }
}

impl<'de> Deserialize<'de> for VoteValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = i16::deserialize(deserializer)?;
        VoteValue::try_from(inner).map_err(|_| {
            Error::invalid_value(Unexpected::Signed(inner.into()), &"a vote value of -1 or 1")
        })
    }
}

/// Request body of the vote upsert endpoint.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVote {
    pub post_id: Id<PostMarker>,
    pub user_id: Id<UserMarker>,
    pub value: VoteValue,
}

/// What the upsert endpoint replies with. The id is stable across value
/// changes for the same (post, user) pair.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
pub struct VoteReceipt {
    pub id: Id<VoteMarker>,
    pub value: VoteValue,
}

#[cfg(test)]
mod tests {
    use crate::model::vote::VoteValue;

    #[test]
    fn decodes_only_signed_units() {
        assert_eq!(VoteValue::try_from(1), Ok(VoteValue::Up));
        assert_eq!(VoteValue::try_from(-1), Ok(VoteValue::Down));
        assert!(VoteValue::try_from(0).is_err());
        assert!(VoteValue::try_from(2).is_err());
        assert!(VoteValue::try_from(-2).is_err());
    }

    #[test]
    fn scores_match_wire_values() {
        assert_eq!(VoteValue::Up.score(), 1);
        assert_eq!(VoteValue::Down.score(), -1);
    }

    #[test]
    fn serde_round_trip() {
        let up = serde_json::to_string(&VoteValue::Up).unwrap();
        assert_eq!(up, "1");
        assert_eq!(serde_json::from_str::<VoteValue>("-1").unwrap(), VoteValue::Down);
        assert!(serde_json::from_str::<VoteValue>("0").is_err());
    }
}
