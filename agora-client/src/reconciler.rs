use crate::{
    error::{ClientError, Result},
    gateway::PostGateway,
    store::PostStore,
    viewer::Viewer,
};
use agora_common::model::{post::Post, vote::VoteValue};
use tracing::{debug, warn};

/// How a desired vote relates to the voter's existing ledger entry for the
/// same post.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum VoteIntent {
    /// No existing vote; a new one is cast.
    Cast(VoteValue),
    /// The existing vote equals the desired one; the click toggles it off.
    Retract(VoteValue),
    /// The existing vote is the opposite; its value flips.
    Flip(VoteValue),
}

impl VoteIntent {
    #[must_use]
    pub fn plan(existing: Option<VoteValue>, desired: VoteValue) -> Self {
        match existing {
            None => VoteIntent::Cast(desired),
            Some(current) if current == desired => VoteIntent::Retract(current),
            Some(_) => VoteIntent::Flip(desired),
        }
    }

    /// Net-score delta the intent applies on top of the current snapshot:
    /// ±1 for a cast, the inverse for a retraction, ±2 for a flip.
    #[must_use]
    pub fn score_delta(self) -> i64 {
        match self {
            VoteIntent::Cast(value) => value.score(),
            VoteIntent::Retract(value) => -value.score(),
            VoteIntent::Flip(value) => 2 * value.score(),
        }
    }

    /// The ledger entry for the (post, user) pair once the intent holds.
    #[must_use]
    pub fn ledger_entry(self) -> Option<VoteValue> {
        match self {
            VoteIntent::Cast(value) | VoteIntent::Flip(value) => Some(value),
            VoteIntent::Retract(_) => None,
        }
    }
}

/// What [`VoteReconciler::apply_vote`] settled on: the post as every cache
/// now shows it, and the caller's ledger entry for it.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct VoteOutcome {
    pub post: Post,
    pub ledger_entry: Option<VoteValue>,
}

/// Applies vote intents optimistically and reconciles the caches with the
/// server's verdict.
#[derive(Clone, Debug)]
pub struct VoteReconciler<Gateway> {
    gateway: Gateway,
}

impl<Gateway: PostGateway> VoteReconciler<Gateway> {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Applies `desired` against the viewer's existing vote on `post`.
    ///
    /// The resulting snapshot and ledger change are propagated to every
    /// cache before the server call resolves. On failure the pre-click state
    /// is restored in full and the error returned; the caches never keep an
    /// unconfirmed delta.
    ///
    /// Holding the store mutably across the await also serializes intents:
    /// a second vote cannot start computing against a ledger entry that an
    /// in-flight call is about to change.
    pub async fn apply_vote(
        &self,
        store: &mut PostStore,
        post: &Post,
        desired: VoteValue,
        viewer: Viewer,
    ) -> Result<VoteOutcome> {
        let Viewer::SignedIn(user_id) = viewer else {
            return Err(ClientError::SignedOut);
        };
        if store.find_post(post.id).is_none() {
            return Err(ClientError::PostNotCached(post.id));
        }

        let existing = store.own_vote(post.id);
        let intent = VoteIntent::plan(existing, desired);

        let mut updated = post.clone();
        updated.net_score = post.net_score + intent.score_delta();
        updated.current_user_vote = intent.ledger_entry();

        store.propagate_update(&updated);
        store.set_own_vote(post.id, intent.ledger_entry());

        let confirmed = match intent {
            VoteIntent::Cast(value) | VoteIntent::Flip(value) => self
                .gateway
                .cast_vote(post.id, user_id, value)
                .await
                .map(|receipt| debug!(vote_id = %receipt.id, "Vote confirmed")),
            VoteIntent::Retract(_) => self.gateway.retract_vote(post.id, user_id).await,
        };

        if let Err(err) = confirmed {
            warn!(post_id = %post.id, error = %err, "Vote failed, rolling back");
            store.propagate_update(post);
            store.set_own_vote(post.id, existing);
            return Err(err.into());
        }

        Ok(VoteOutcome {
            post: updated,
            ledger_entry: intent.ledger_entry(),
        })
    }

    /// Deletes the viewer's own post. Caches are only touched once the
    /// server confirms, so there is nothing to roll back.
    pub async fn delete_post(
        &self,
        store: &mut PostStore,
        post: &Post,
        viewer: Viewer,
    ) -> Result<()> {
        let Viewer::SignedIn(user_id) = viewer else {
            return Err(ClientError::SignedOut);
        };
        if user_id != post.creator_id {
            return Err(ClientError::NotPostCreator(post.id));
        }

        self.gateway.delete_post(post.id).await?;
        store.propagate_deletion(post.id);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ClientError,
        reconciler::{VoteIntent, VoteReconciler},
        store::{FeedKey, PostStore},
        testing::{self, TestGateway},
        viewer::Viewer,
    };
    use agora_common::model::{Id, post::Post, vote::VoteValue};

    fn seeded(post: &Post) -> (PostStore, TestGateway) {
        let mut store = PostStore::new();
        store.set_feed(FeedKey::Home, vec![post.clone()]);
        store.set_feed(FeedKey::Community(post.community_id), vec![post.clone()]);
        store.select(post.clone());

        let gateway = TestGateway::with_posts(vec![post.clone()]);
        (store, gateway)
    }

    #[test]
    fn intent_table() {
        use VoteValue::{Down, Up};

        assert_eq!(VoteIntent::plan(None, Up), VoteIntent::Cast(Up));
        assert_eq!(VoteIntent::plan(None, Down), VoteIntent::Cast(Down));
        assert_eq!(VoteIntent::plan(Some(Up), Up), VoteIntent::Retract(Up));
        assert_eq!(VoteIntent::plan(Some(Down), Down), VoteIntent::Retract(Down));
        assert_eq!(VoteIntent::plan(Some(Down), Up), VoteIntent::Flip(Up));
        assert_eq!(VoteIntent::plan(Some(Up), Down), VoteIntent::Flip(Down));

        assert_eq!(VoteIntent::Cast(Up).score_delta(), 1);
        assert_eq!(VoteIntent::Cast(Down).score_delta(), -1);
        assert_eq!(VoteIntent::Retract(Up).score_delta(), -1);
        assert_eq!(VoteIntent::Retract(Down).score_delta(), 1);
        assert_eq!(VoteIntent::Flip(Up).score_delta(), 2);
        assert_eq!(VoteIntent::Flip(Down).score_delta(), -2);
    }

    #[tokio::test]
    async fn fresh_vote_updates_every_cache() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        let reconciler = VoteReconciler::new(gateway.clone());

        let outcome = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::SignedIn(user))
            .await
            .unwrap();

        assert_eq!(outcome.post.net_score, post.net_score + 1);
        assert_eq!(outcome.ledger_entry, Some(VoteValue::Up));
        assert_eq!(store.own_vote(post.id), Some(VoteValue::Up));
        assert_eq!(store.feed(FeedKey::Home)[0].net_score, post.net_score + 1);
        assert_eq!(
            store.feed(FeedKey::Community(post.community_id))[0].net_score,
            post.net_score + 1
        );
        assert_eq!(store.selected().unwrap().net_score, post.net_score + 1);
        assert_eq!(gateway.recorded_vote(post.id, user), Some(VoteValue::Up));
    }

    #[tokio::test]
    async fn toggle_off_restores_the_original_score() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        let reconciler = VoteReconciler::new(gateway.clone());

        let first = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::SignedIn(user))
            .await
            .unwrap();
        let second = reconciler
            .apply_vote(&mut store, &first.post, VoteValue::Up, Viewer::SignedIn(user))
            .await
            .unwrap();

        assert_eq!(second.post.net_score, post.net_score);
        assert_eq!(second.ledger_entry, None);
        assert_eq!(store.own_vote(post.id), None);
        assert_eq!(gateway.recorded_vote(post.id, user), None);
    }

    #[tokio::test]
    async fn flip_applies_a_double_delta() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        let reconciler = VoteReconciler::new(gateway.clone());

        let upvoted = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::SignedIn(user))
            .await
            .unwrap();
        let flipped = reconciler
            .apply_vote(
                &mut store,
                &upvoted.post,
                VoteValue::Down,
                Viewer::SignedIn(user),
            )
            .await
            .unwrap();

        assert_eq!(flipped.post.net_score, upvoted.post.net_score - 2);
        assert_eq!(flipped.post.net_score, post.net_score - 1);
        assert_eq!(store.own_vote(post.id), Some(VoteValue::Down));
        assert_eq!(gateway.recorded_vote(post.id, user), Some(VoteValue::Down));
    }

    #[tokio::test]
    async fn a_sequence_settles_on_the_last_uncancelled_intent() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        let reconciler = VoteReconciler::new(gateway.clone());

        use VoteValue::{Down, Up};
        let mut current = post.clone();
        for desired in [Up, Up, Down, Down, Up] {
            current = reconciler
                .apply_vote(&mut store, &current, desired, Viewer::SignedIn(user))
                .await
                .unwrap()
                .post;
        }

        assert_eq!(current.net_score, post.net_score + 1);
        assert_eq!(store.ledger().len(), 1);
        assert_eq!(store.own_vote(post.id), Some(Up));
    }

    #[tokio::test]
    async fn anonymous_votes_are_rejected_before_the_network() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let reconciler = VoteReconciler::new(gateway.clone());

        let result = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::Anonymous)
            .await;

        assert!(matches!(result, Err(ClientError::SignedOut)));
        assert_eq!(store.feed(FeedKey::Home)[0], post);
        assert_eq!(gateway.vote_calls(), 0);
    }

    #[tokio::test]
    async fn votes_on_uncached_posts_are_rejected() {
        let cached = testing::post(Id::random());
        let stranger = testing::post(Id::random());
        let (mut store, gateway) = seeded(&cached);
        let reconciler = VoteReconciler::new(gateway.clone());

        let result = reconciler
            .apply_vote(
                &mut store,
                &stranger,
                VoteValue::Up,
                Viewer::SignedIn(Id::random()),
            )
            .await;

        assert!(matches!(result, Err(ClientError::PostNotCached(id)) if id == stranger.id));
        assert_eq!(gateway.vote_calls(), 0);
    }

    #[tokio::test]
    async fn failed_votes_roll_back_in_full() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        gateway.fail_votes();
        let reconciler = VoteReconciler::new(gateway.clone());

        let result = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::SignedIn(user))
            .await;

        assert!(matches!(result, Err(ClientError::Network(_))));
        assert_eq!(store.feed(FeedKey::Home)[0], post);
        assert_eq!(
            store.feed(FeedKey::Community(post.community_id))[0],
            post
        );
        assert_eq!(store.selected(), Some(&post));
        assert_eq!(store.own_vote(post.id), None);
    }

    #[tokio::test]
    async fn failed_retraction_restores_the_prior_entry() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let user = Id::random();
        let reconciler = VoteReconciler::new(gateway.clone());

        let upvoted = reconciler
            .apply_vote(&mut store, &post, VoteValue::Up, Viewer::SignedIn(user))
            .await
            .unwrap();

        gateway.fail_votes();
        let result = reconciler
            .apply_vote(&mut store, &upvoted.post, VoteValue::Up, Viewer::SignedIn(user))
            .await;

        assert!(result.is_err());
        assert_eq!(store.own_vote(post.id), Some(VoteValue::Up));
        assert_eq!(store.feed(FeedKey::Home)[0], upvoted.post);
    }

    #[tokio::test]
    async fn creators_can_delete_their_posts() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let reconciler = VoteReconciler::new(gateway.clone());

        reconciler
            .delete_post(&mut store, &post, Viewer::SignedIn(post.creator_id))
            .await
            .unwrap();

        assert!(store.find_post(post.id).is_none());
        assert!(store.feed(FeedKey::Home).is_empty());
        assert_eq!(store.selected(), None);
    }

    #[tokio::test]
    async fn only_the_creator_may_delete() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        let reconciler = VoteReconciler::new(gateway.clone());

        let result = reconciler
            .delete_post(&mut store, &post, Viewer::SignedIn(Id::random()))
            .await;

        assert!(matches!(result, Err(ClientError::NotPostCreator(_))));
        assert_eq!(store.feed(FeedKey::Home)[0], post);
    }

    #[tokio::test]
    async fn failed_deletions_leave_the_caches_alone() {
        let post = testing::post(Id::random());
        let (mut store, gateway) = seeded(&post);
        gateway.fail_deletes();
        let reconciler = VoteReconciler::new(gateway.clone());

        let result = reconciler
            .delete_post(&mut store, &post, Viewer::SignedIn(post.creator_id))
            .await;

        assert!(result.is_err());
        assert_eq!(store.feed(FeedKey::Home)[0], post);
        assert_eq!(store.selected(), Some(&post));
    }
}
