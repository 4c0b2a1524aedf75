use crate::record::{
    CommentRecord, CommunityRecord, MembershipRecord, PostRecord, UserRecord, VoteReceiptRecord,
};
use agora_common::model::{
    Id, ModelValidationError,
    comment::{Comment, CommentMarker, CreateComment},
    community::{Community, CommunityMarker, CreateCommunity, Membership},
    post::{CreatePost, Post, PostMarker},
    user::{CreateUser, User, UserMarker},
    vote::{VoteMarker, VoteReceipt, VoteValue},
};
use sqlx::{PgPool, postgres::PgPoolOptions, query, query_as, query_scalar};
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A community with that name already exists")]
    DuplicateCommunityName,
    #[error("A referenced post, user or community does not exist")]
    MissingReference,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl DbError {
    fn on_unique_violation(err: sqlx::Error, instead: DbError) -> DbError {
        if err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation())
        {
            instead
        } else {
            err.into()
        }
    }

    fn on_foreign_key_violation(err: sqlx::Error) -> DbError {
        if err
            .as_database_error()
            .is_some_and(|db_err| db_err.is_foreign_key_violation())
        {
            DbError::MissingReference
        } else {
            err.into()
        }
    }
}

#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn create_user(&self, user: &CreateUser) -> Result<User> {
        let record: UserRecord = query_as(
            "
            INSERT INTO users (user_id, display_name)
            VALUES ($1, $2)
            RETURNING user_id, display_name, created_at
            ",
        )
        .bind(Id::<UserMarker>::random().uuid())
        .bind(user.display_name.get())
        .fetch_one(&self.pool)
        .await?;

        Ok(record.try_into()?)
    }

    pub async fn fetch_user(&self, user_id: Id<UserMarker>) -> Result<Option<User>> {
        let record: Option<UserRecord> = query_as(
            "
            SELECT user_id, display_name, created_at
            FROM users
            WHERE user_id = $1
            ",
        )
        .bind(user_id.uuid())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(User::try_from).transpose()?;
        Ok(user)
    }

    /// Creates a community and enrolls the creator as its first moderator.
    pub async fn create_community(&self, community: &CreateCommunity) -> Result<Community> {
        let mut tx = self.pool.begin().await?;

        let record: CommunityRecord = query_as(
            "
            INSERT INTO communities (community_id, name, creator_id)
            VALUES ($1, $2, $3)
            RETURNING community_id, name, creator_id, 1::BIGINT AS member_count, created_at
            ",
        )
        .bind(Id::<CommunityMarker>::random().uuid())
        .bind(community.name.get())
        .bind(community.creator_id.uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| DbError::on_unique_violation(err, DbError::DuplicateCommunityName))?;

        query(
            "
            INSERT INTO community_members (community_id, user_id, is_moderator)
            VALUES ($1, $2, TRUE)
            ",
        )
        .bind(record.community_id)
        .bind(community.creator_id.uuid())
        .execute(&mut *tx)
        .await
        .map_err(DbError::on_foreign_key_violation)?;

        tx.commit().await?;

        Ok(record.try_into()?)
    }

    pub async fn list_communities(&self, limit: i64) -> Result<Vec<Community>> {
        let records: Vec<CommunityRecord> = query_as(
            "
            SELECT
                c.community_id,
                c.name,
                c.creator_id,
                COUNT(m.user_id) AS member_count,
                c.created_at
            FROM communities c
            LEFT JOIN community_members m ON m.community_id = c.community_id
            GROUP BY c.community_id
            ORDER BY c.created_at DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let communities = records
            .into_iter()
            .map(Community::try_from)
            .collect::<Result<_, _>>()?;
        Ok(communities)
    }

    pub async fn fetch_community(
        &self,
        community_id: Id<CommunityMarker>,
    ) -> Result<Option<Community>> {
        let record: Option<CommunityRecord> = query_as(
            "
            SELECT
                c.community_id,
                c.name,
                c.creator_id,
                COUNT(m.user_id) AS member_count,
                c.created_at
            FROM communities c
            LEFT JOIN community_members m ON m.community_id = c.community_id
            WHERE c.community_id = $1
            GROUP BY c.community_id
            ",
        )
        .bind(community_id.uuid())
        .fetch_optional(&self.pool)
        .await?;

        let community = record.map(Community::try_from).transpose()?;
        Ok(community)
    }

    /// Idempotent: joining a community twice leaves the existing membership
    /// (and its moderator flag) untouched.
    pub async fn join_community(
        &self,
        community_id: Id<CommunityMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<Membership> {
        let record: MembershipRecord = query_as(
            "
            INSERT INTO community_members (community_id, user_id, is_moderator)
            VALUES ($1, $2, FALSE)
            ON CONFLICT (community_id, user_id)
                DO UPDATE SET is_moderator = community_members.is_moderator
            RETURNING community_id, user_id, is_moderator
            ",
        )
        .bind(community_id.uuid())
        .bind(user_id.uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::on_foreign_key_violation)?;

        Ok(record.into())
    }

    pub async fn leave_community(
        &self,
        community_id: Id<CommunityMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<()> {
        query(
            "
            DELETE FROM community_members
            WHERE community_id = $1 AND user_id = $2
            ",
        )
        .bind(community_id.uuid())
        .bind(user_id.uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Memberships in join order, which is the stable order the feed
    /// composer selects communities in.
    pub async fn joined_communities(&self, user_id: Id<UserMarker>) -> Result<Vec<Membership>> {
        let records: Vec<MembershipRecord> = query_as(
            "
            SELECT community_id, user_id, is_moderator
            FROM community_members
            WHERE user_id = $1
            ORDER BY joined_at
            ",
        )
        .bind(user_id.uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Membership::from).collect())
    }

    /// Posts ordered by creation time descending, each annotated with its
    /// derived net score and, when `viewer` is given, that user's own vote.
    pub async fn list_posts(
        &self,
        community_id: Option<Id<CommunityMarker>>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Vec<Post>> {
        let records: Vec<PostRecord> = query_as(
            "
            SELECT
                p.post_id,
                p.community_id,
                p.creator_id,
                p.title,
                p.body,
                p.comment_count,
                p.created_at,
                COALESCE(SUM(v.value), 0)::BIGINT AS net_score,
                uv.value AS viewer_vote
            FROM posts p
            LEFT JOIN post_votes v ON v.post_id = p.post_id
            LEFT JOIN post_votes uv ON uv.post_id = p.post_id AND uv.user_id = $2
            WHERE $1::UUID IS NULL OR p.community_id = $1
            GROUP BY p.post_id, uv.value
            ORDER BY p.created_at DESC
            ",
        )
        .bind(community_id.map(Id::uuid))
        .bind(viewer.map(Id::uuid))
        .fetch_all(&self.pool)
        .await?;

        let posts = records
            .into_iter()
            .map(Post::try_from)
            .collect::<Result<_, _>>()?;
        Ok(posts)
    }

    pub async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Option<Post>> {
        let record: Option<PostRecord> = query_as(
            "
            SELECT
                p.post_id,
                p.community_id,
                p.creator_id,
                p.title,
                p.body,
                p.comment_count,
                p.created_at,
                COALESCE(SUM(v.value), 0)::BIGINT AS net_score,
                uv.value AS viewer_vote
            FROM posts p
            LEFT JOIN post_votes v ON v.post_id = p.post_id
            LEFT JOIN post_votes uv ON uv.post_id = p.post_id AND uv.user_id = $2
            WHERE p.post_id = $1
            GROUP BY p.post_id, uv.value
            ",
        )
        .bind(post_id.uuid())
        .bind(viewer.map(Id::uuid))
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    pub async fn create_post(&self, post: &CreatePost) -> Result<Post> {
        let record: PostRecord = query_as(
            "
            INSERT INTO posts (post_id, community_id, creator_id, title, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                post_id,
                community_id,
                creator_id,
                title,
                body,
                comment_count,
                created_at,
                0::BIGINT AS net_score,
                NULL::SMALLINT AS viewer_vote
            ",
        )
        .bind(Id::<PostMarker>::random().uuid())
        .bind(post.community_id.uuid())
        .bind(post.creator_id.uuid())
        .bind(post.title.get())
        .bind(&post.body)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::on_foreign_key_violation)?;

        Ok(record.try_into()?)
    }

    /// Returns whether a row was actually deleted. Associated votes and
    /// comments go with it via the cascade.
    pub async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<bool> {
        let result = query(
            "
            DELETE FROM posts
            WHERE post_id = $1
            ",
        )
        .bind(post_id.uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Creates or replaces the unique (post, user) vote row. Retrying the
    /// same call yields the same final row, id included.
    pub async fn upsert_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        value: VoteValue,
    ) -> Result<VoteReceipt> {
        let record: VoteReceiptRecord = query_as(
            "
            INSERT INTO post_votes (vote_id, post_id, user_id, value)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (post_id, user_id) DO UPDATE SET value = EXCLUDED.value
            RETURNING vote_id, value
            ",
        )
        .bind(Id::<VoteMarker>::random().uuid())
        .bind(post_id.uuid())
        .bind(user_id.uuid())
        .bind(value.as_i16())
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::on_foreign_key_violation)?;

        Ok(record.try_into()?)
    }

    /// Deletes the (post, user) vote row if present; absence is not an error.
    pub async fn remove_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Result<()> {
        query(
            "
            DELETE FROM post_votes
            WHERE post_id = $1 AND user_id = $2
            ",
        )
        .bind(post_id.uuid())
        .bind(user_id.uuid())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The authoritative aggregate: always computed from the vote rows.
    pub async fn net_score(&self, post_id: Id<PostMarker>) -> Result<i64> {
        let score: i64 = query_scalar(
            "
            SELECT COALESCE(SUM(value), 0)::BIGINT
            FROM post_votes
            WHERE post_id = $1
            ",
        )
        .bind(post_id.uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(score)
    }

    /// Inserts the comment and bumps the parent's counter in one
    /// transaction. Returns `None` when the post does not exist.
    pub async fn create_comment(
        &self,
        post_id: Id<PostMarker>,
        comment: &CreateComment,
    ) -> Result<Option<Comment>> {
        let mut tx = self.pool.begin().await?;

        let updated = query(
            "
            UPDATE posts
            SET comment_count = comment_count + 1
            WHERE post_id = $1
            ",
        )
        .bind(post_id.uuid())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let record: CommentRecord = query_as(
            "
            INSERT INTO comments (comment_id, post_id, creator_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING comment_id, post_id, creator_id, body, created_at
            ",
        )
        .bind(Id::<CommentMarker>::random().uuid())
        .bind(post_id.uuid())
        .bind(comment.creator_id.uuid())
        .bind(&comment.body)
        .fetch_one(&mut *tx)
        .await
        .map_err(DbError::on_foreign_key_violation)?;

        tx.commit().await?;

        Ok(Some(record.into()))
    }

    pub async fn list_comments(&self, post_id: Id<PostMarker>) -> Result<Vec<Comment>> {
        let records: Vec<CommentRecord> = query_as(
            "
            SELECT comment_id, post_id, creator_id, body, created_at
            FROM comments
            WHERE post_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(post_id.uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(Comment::from).collect())
    }

    /// The parent post's comment counter is monotonic; deleting a comment
    /// does not decrement it.
    pub async fn delete_comment(&self, comment_id: Id<CommentMarker>) -> Result<bool> {
        let result = query(
            "
            DELETE FROM comments
            WHERE comment_id = $1
            ",
        )
        .bind(comment_id.uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
