use agora_common::model::{
    ModelValidationError,
    comment::Comment,
    community::{Community, CommunityName, Membership},
    post::{Post, PostTitle},
    user::{DisplayName, User},
    vote::{VoteReceipt, VoteValue},
};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct PostRecord {
    pub post_id: Uuid,
    pub community_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub body: String,
    pub comment_count: i32,
    pub created_at: OffsetDateTime,
    pub net_score: i64,
    pub viewer_vote: Option<i16>,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct UserRecord {
    pub user_id: Uuid,
    pub display_name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommunityRecord {
    pub community_id: Uuid,
    pub name: String,
    pub creator_id: Uuid,
    pub member_count: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct MembershipRecord {
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub is_moderator: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_id: Uuid,
    pub post_id: Uuid,
    pub creator_id: Uuid,
    pub body: String,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, FromRow)]
pub(crate) struct VoteReceiptRecord {
    pub vote_id: Uuid,
    pub value: i16,
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.post_id.into(),
            community_id: value.community_id.into(),
            creator_id: value.creator_id.into(),
            title: PostTitle::new(value.title)?,
            body: value.body,
            number_of_comments: value.comment_count,
            net_score: value.net_score,
            current_user_vote: value.viewer_vote.map(VoteValue::try_from).transpose()?,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl TryFrom<UserRecord> for User {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.user_id.into(),
            display_name: DisplayName::new(value.display_name)?,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl TryFrom<CommunityRecord> for Community {
    type Error = ModelValidationError;

    fn try_from(value: CommunityRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.community_id.into(),
            name: CommunityName::new(value.name)?,
            creator_id: value.creator_id.into(),
            number_of_members: value.member_count,
            created_at: value.created_at.to_utc(),
        })
    }
}

impl From<MembershipRecord> for Membership {
    fn from(value: MembershipRecord) -> Self {
        Self {
            community_id: value.community_id.into(),
            user_id: value.user_id.into(),
            is_moderator: value.is_moderator,
        }
    }
}

impl From<CommentRecord> for Comment {
    fn from(value: CommentRecord) -> Self {
        Self {
            id: value.comment_id.into(),
            post_id: value.post_id.into(),
            creator_id: value.creator_id.into(),
            body: value.body,
            created_at: value.created_at.to_utc(),
        }
    }
}

impl TryFrom<VoteReceiptRecord> for VoteReceipt {
    type Error = ModelValidationError;

    fn try_from(value: VoteReceiptRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.vote_id.into(),
            value: VoteValue::try_from(value.value)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{PostRecord, VoteReceiptRecord};
    use agora_common::model::{
        post::Post,
        vote::{VoteReceipt, VoteValue},
    };
    use time::macros::datetime;
    use uuid::Uuid;

    fn post_record() -> PostRecord {
        PostRecord {
            post_id: Uuid::new_v4(),
            community_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "Welcome".to_owned(),
            body: "First post".to_owned(),
            comment_count: 2,
            created_at: datetime!(2026-02-01 12:00 UTC),
            net_score: 4,
            viewer_vote: None,
        }
    }

    #[test]
    fn post_without_viewer_vote() {
        let post = Post::try_from(post_record()).unwrap();

        assert_eq!(post.net_score, 4);
        assert_eq!(post.current_user_vote, None);
    }

    #[test]
    fn post_with_viewer_vote() {
        let record = PostRecord {
            viewer_vote: Some(-1),
            ..post_record()
        };

        let post = Post::try_from(record).unwrap();
        assert_eq!(post.current_user_vote, Some(VoteValue::Down));
    }

    #[test]
    fn post_with_invalid_viewer_vote() {
        let record = PostRecord {
            viewer_vote: Some(3),
            ..post_record()
        };

        assert!(Post::try_from(record).is_err());
    }

    #[test]
    fn post_with_invalid_title() {
        let record = PostRecord {
            title: String::new(),
            ..post_record()
        };

        assert!(Post::try_from(record).is_err());
    }

    #[test]
    fn vote_receipt() {
        let vote_id = Uuid::new_v4();
        let receipt = VoteReceipt::try_from(VoteReceiptRecord { vote_id, value: 1 }).unwrap();

        assert_eq!(receipt.id, vote_id.into());
        assert_eq!(receipt.value, VoteValue::Up);
    }
}
