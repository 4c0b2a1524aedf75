use agora_common::model::{
    Id,
    community::CommunityMarker,
    post::{Post, PostMarker},
    vote::VoteValue,
};
use std::collections::HashMap;

/// Addresses one feed bucket in the store.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FeedKey {
    /// The reserved global "no community" feed.
    Home,
    Community(Id<CommunityMarker>),
}

/// The client's view of post state, owned by the application root and passed
/// by reference to whatever needs it.
///
/// Several buckets (and the selected post) may hold snapshots of the same
/// logical post. All mutation goes through [`propagate_update`] and
/// [`propagate_deletion`], one uniform transform over every cache, so after
/// any completed mutation every copy of a post id agrees on its `net_score`
/// and no cache holds a deleted id.
///
/// [`propagate_update`]: PostStore::propagate_update
/// [`propagate_deletion`]: PostStore::propagate_deletion
#[derive(Clone, Debug, Default)]
pub struct PostStore {
    feeds: HashMap<FeedKey, Vec<Post>>,
    ledger: HashMap<Id<PostMarker>, VoteValue>,
    selected: Option<Post>,
}

impl PostStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces one bucket with a freshly fetched, server-ordered page.
    pub fn set_feed(&mut self, key: FeedKey, posts: Vec<Post>) {
        self.feeds.insert(key, posts);
    }

    #[must_use]
    pub fn feed(&self, key: FeedKey) -> &[Post] {
        self.feeds.get(&key).map_or(&[], Vec::as_slice)
    }

    /// First cached copy of the post, searching every bucket and then the
    /// selected slot. Coherence makes all copies interchangeable.
    #[must_use]
    pub fn find_post(&self, post_id: Id<PostMarker>) -> Option<&Post> {
        self.feeds
            .values()
            .flatten()
            .find(|post| post.id == post_id)
            .or_else(|| self.selected.as_ref().filter(|post| post.id == post_id))
    }

    pub fn select(&mut self, post: Post) {
        self.selected = Some(post);
    }

    #[must_use]
    pub fn selected(&self) -> Option<&Post> {
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Replaces every cached copy of `post.id` with `post`. Buckets that do
    /// not hold the post are untouched; this never inserts.
    pub fn propagate_update(&mut self, post: &Post) {
        self.transform(post.id, |_| Some(post.clone()));
    }

    /// Prunes `post_id` from every bucket and the selected slot, not just
    /// the bucket the deletion was issued against, and drops its ledger
    /// entry. Leaving another bucket unpruned would orphan a stale entry.
    pub fn propagate_deletion(&mut self, post_id: Id<PostMarker>) {
        self.transform(post_id, |_| None);
        self.ledger.remove(&post_id);
    }

    /// The single transform every cache mutation goes through: applied to
    /// each matching snapshot, `Some` replaces it and `None` removes it.
    fn transform(&mut self, post_id: Id<PostMarker>, apply: impl Fn(&Post) -> Option<Post>) {
        for bucket in self.feeds.values_mut() {
            let mut index = 0;
            while index < bucket.len() {
                if bucket[index].id == post_id {
                    match apply(&bucket[index]) {
                        Some(next) => {
                            bucket[index] = next;
                            index += 1;
                        }
                        None => {
                            bucket.remove(index);
                        }
                    }
                } else {
                    index += 1;
                }
            }
        }

        if let Some(selected) = self.selected.take_if(|selected| selected.id == post_id) {
            self.selected = apply(&selected);
        }
    }

    /// The current user's own vote on the post, if any.
    #[must_use]
    pub fn own_vote(&self, post_id: Id<PostMarker>) -> Option<VoteValue> {
        self.ledger.get(&post_id).copied()
    }

    pub fn set_own_vote(&mut self, post_id: Id<PostMarker>, value: Option<VoteValue>) {
        match value {
            Some(value) => {
                self.ledger.insert(post_id, value);
            }
            None => {
                self.ledger.remove(&post_id);
            }
        }
    }

    #[must_use]
    pub fn ledger(&self) -> &HashMap<Id<PostMarker>, VoteValue> {
        &self.ledger
    }

    /// Re-derives the ledger from the `current_user_vote` annotations of
    /// every cached post, after fresh pages came in.
    pub fn rebuild_ledger(&mut self) {
        let mut next = HashMap::new();
        for post in self.feeds.values().flatten().chain(self.selected.iter()) {
            if let Some(value) = post.current_user_vote {
                next.insert(post.id, value);
            }
        }

        self.ledger = next;
    }

    /// Called on sign-out; an unauthenticated session has no ledger.
    pub fn clear_ledger(&mut self) {
        self.ledger.clear();
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        store::{FeedKey, PostStore},
        testing,
    };
    use agora_common::model::{Id, vote::VoteValue};

    #[test]
    fn update_propagates_to_every_cache() {
        let community = Id::random();
        let post = testing::post(community);
        let other = testing::post(community);

        let mut store = PostStore::new();
        store.set_feed(FeedKey::Home, vec![post.clone(), other.clone()]);
        store.set_feed(FeedKey::Community(community), vec![post.clone()]);
        store.select(post.clone());

        let mut updated = post.clone();
        updated.net_score += 1;
        store.propagate_update(&updated);

        assert_eq!(store.feed(FeedKey::Home), [updated.clone(), other]);
        assert_eq!(store.feed(FeedKey::Community(community)), [updated.clone()]);
        assert_eq!(store.selected(), Some(&updated));
    }

    #[test]
    fn update_does_not_insert_into_other_buckets() {
        let community = Id::random();
        let elsewhere = Id::random();
        let post = testing::post(community);

        let mut store = PostStore::new();
        store.set_feed(FeedKey::Community(community), vec![post.clone()]);
        store.set_feed(FeedKey::Community(elsewhere), vec![]);

        store.propagate_update(&post);

        assert!(store.feed(FeedKey::Community(elsewhere)).is_empty());
    }

    #[test]
    fn deletion_prunes_every_cache_and_the_ledger() {
        let community = Id::random();
        let post = testing::post(community);
        let other = testing::post(community);

        let mut store = PostStore::new();
        store.set_feed(FeedKey::Home, vec![post.clone(), other.clone()]);
        store.set_feed(FeedKey::Community(community), vec![post.clone(), other.clone()]);
        store.select(post.clone());
        store.set_own_vote(post.id, Some(VoteValue::Up));

        store.propagate_deletion(post.id);

        assert_eq!(store.feed(FeedKey::Home), [other.clone()]);
        assert_eq!(store.feed(FeedKey::Community(community)), [other]);
        assert_eq!(store.selected(), None);
        assert_eq!(store.own_vote(post.id), None);
        assert!(store.find_post(post.id).is_none());
    }

    #[test]
    fn deletion_leaves_unrelated_selection_alone() {
        let community = Id::random();
        let post = testing::post(community);
        let other = testing::post(community);

        let mut store = PostStore::new();
        store.set_feed(FeedKey::Home, vec![post.clone(), other.clone()]);
        store.select(other.clone());

        store.propagate_deletion(post.id);

        assert_eq!(store.selected(), Some(&other));
    }

    #[test]
    fn ledger_rebuilds_from_cached_annotations() {
        let community = Id::random();
        let mut upvoted = testing::post(community);
        upvoted.current_user_vote = Some(VoteValue::Up);
        let mut downvoted = testing::post(community);
        downvoted.current_user_vote = Some(VoteValue::Down);
        let plain = testing::post(community);

        let mut store = PostStore::new();
        store.set_feed(FeedKey::Home, vec![upvoted.clone(), plain]);
        store.set_feed(FeedKey::Community(community), vec![downvoted.clone()]);

        store.rebuild_ledger();

        assert_eq!(store.ledger().len(), 2);
        assert_eq!(store.own_vote(upvoted.id), Some(VoteValue::Up));
        assert_eq!(store.own_vote(downvoted.id), Some(VoteValue::Down));

        store.clear_ledger();
        assert!(store.ledger().is_empty());
    }
}
