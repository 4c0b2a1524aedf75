use crate::{
    error::{ClientError, Result},
    gateway::PostGateway,
    store::{FeedKey, PostStore},
    viewer::Viewer,
};
use agora_common::model::{
    Id,
    community::CommunityMarker,
    post::{Post, PostMarker},
    user::UserMarker,
};
use futures::future::join_all;
use tracing::warn;

/// Cap of the global fallback feed.
pub const GLOBAL_FEED_LIMIT: usize = 10;
/// How many joined communities the fan-out samples.
pub const FANOUT_COMMUNITY_LIMIT: usize = 3;
/// How many posts each sampled community contributes.
pub const FANOUT_POSTS_PER_COMMUNITY: usize = 3;

/// Result of a home-feed composition. A failed per-community fetch shortens
/// the feed instead of aborting it; the affected communities are reported
/// here so the shell can surface them.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ComposedFeed {
    pub posts: Vec<Post>,
    pub failed_communities: Vec<Id<CommunityMarker>>,
}

/// Builds the feed buckets of a [`PostStore`].
///
/// The home feed is a bounded cross-community sample for members (at most
/// 3 communities x 3 posts, fetched concurrently) and a capped global page
/// for everyone else, so a fresh account never sees an empty home page and a
/// heavily subscribed one never amplifies into unbounded requests.
#[derive(Clone, Debug)]
pub struct FeedComposer<Gateway> {
    gateway: Gateway,
}

impl<Gateway: PostGateway> FeedComposer<Gateway> {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn compose_home_feed(
        &self,
        store: &mut PostStore,
        viewer: Viewer,
        joined: &[Id<CommunityMarker>],
    ) -> Result<ComposedFeed> {
        match viewer {
            Viewer::SignedIn(user_id) if !joined.is_empty() => {
                self.fan_out(store, user_id, joined).await
            }
            _ => self.global_feed(store, viewer).await,
        }
    }

    async fn global_feed(&self, store: &mut PostStore, viewer: Viewer) -> Result<ComposedFeed> {
        let mut posts = self.gateway.list_posts(None, viewer.user_id()).await?;
        posts.truncate(GLOBAL_FEED_LIMIT);

        store.set_feed(FeedKey::Home, posts.clone());
        if viewer.is_signed_in() {
            store.rebuild_ledger();
        } else {
            store.clear_ledger();
        }

        Ok(ComposedFeed {
            posts,
            failed_communities: Vec::new(),
        })
    }

    async fn fan_out(
        &self,
        store: &mut PostStore,
        user_id: Id<UserMarker>,
        joined: &[Id<CommunityMarker>],
    ) -> Result<ComposedFeed> {
        let selected: Vec<_> = joined.iter().copied().take(FANOUT_COMMUNITY_LIMIT).collect();
        let gateway = &self.gateway;
        let fetches = selected
            .iter()
            .map(|&community| gateway.list_posts(Some(community), Some(user_id)));
        let results = join_all(fetches).await;

        let mut posts = Vec::new();
        let mut failed_communities = Vec::new();
        for (community, result) in selected.into_iter().zip(results) {
            match result {
                Ok(community_posts) => {
                    posts.extend(community_posts.into_iter().take(FANOUT_POSTS_PER_COMMUNITY));
                }
                Err(err) => {
                    warn!(%community, error = %err, "Dropping community from the home feed");
                    failed_communities.push(community);
                }
            }
        }

        store.set_feed(FeedKey::Home, posts.clone());
        store.rebuild_ledger();

        Ok(ComposedFeed {
            posts,
            failed_communities,
        })
    }

    /// Fills the bucket backing a community page.
    pub async fn load_community_feed(
        &self,
        store: &mut PostStore,
        community_id: Id<CommunityMarker>,
        viewer: Viewer,
    ) -> Result<Vec<Post>> {
        let posts = self
            .gateway
            .list_posts(Some(community_id), viewer.user_id())
            .await?;

        store.set_feed(FeedKey::Community(community_id), posts.clone());
        if viewer.is_signed_in() {
            store.rebuild_ledger();
        }

        Ok(posts)
    }

    /// Fetches a single post into the selected slot for the detail view.
    pub async fn open_post(
        &self,
        store: &mut PostStore,
        post_id: Id<PostMarker>,
        viewer: Viewer,
    ) -> Result<Post> {
        let post = self
            .gateway
            .fetch_post(post_id, viewer.user_id())
            .await
            .map_err(ClientError::from)?;

        store.select(post.clone());
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ClientError,
        feed::{FeedComposer, GLOBAL_FEED_LIMIT},
        store::{FeedKey, PostStore},
        testing::{self, TestGateway},
        viewer::Viewer,
    };
    use agora_common::model::{Id, community::CommunityMarker, post::Post, vote::VoteValue};

    fn community_posts(community: Id<CommunityMarker>, count: usize) -> Vec<Post> {
        (0..count).map(|_| testing::post(community)).collect()
    }

    #[tokio::test]
    async fn members_get_three_posts_from_each_of_three_communities() {
        let communities: Vec<Id<CommunityMarker>> = (0..4).map(|_| Id::random()).collect();
        let mut posts = Vec::new();
        for &community in &communities {
            posts.extend(community_posts(community, 4));
        }

        let gateway = TestGateway::with_posts(posts);
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let feed = composer
            .compose_home_feed(&mut store, Viewer::SignedIn(Id::random()), &communities)
            .await
            .unwrap();

        assert_eq!(feed.posts.len(), 9);
        assert!(feed.failed_communities.is_empty());
        for (index, &community) in communities[..3].iter().enumerate() {
            let slice = &feed.posts[index * 3..index * 3 + 3];
            assert!(slice.iter().all(|post| post.community_id == community));
        }
        // The fourth community is beyond the fan-out cap.
        assert!(
            feed.posts
                .iter()
                .all(|post| post.community_id != communities[3])
        );
        assert_eq!(store.feed(FeedKey::Home), feed.posts);
    }

    #[tokio::test]
    async fn anonymous_viewers_get_the_capped_global_feed() {
        let posts = community_posts(Id::random(), GLOBAL_FEED_LIMIT + 2);
        let gateway = TestGateway::with_posts(posts.clone());
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let feed = composer
            .compose_home_feed(&mut store, Viewer::Anonymous, &[])
            .await
            .unwrap();

        assert_eq!(feed.posts.len(), GLOBAL_FEED_LIMIT);
        assert_eq!(feed.posts, posts[..GLOBAL_FEED_LIMIT]);
        assert_eq!(store.feed(FeedKey::Home).len(), GLOBAL_FEED_LIMIT);
        assert!(store.ledger().is_empty());
    }

    #[tokio::test]
    async fn members_without_communities_fall_back_to_the_global_feed() {
        let posts = community_posts(Id::random(), 4);
        let gateway = TestGateway::with_posts(posts.clone());
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let feed = composer
            .compose_home_feed(&mut store, Viewer::SignedIn(Id::random()), &[])
            .await
            .unwrap();

        assert_eq!(feed.posts, posts);
    }

    #[tokio::test]
    async fn a_failing_community_shortens_the_feed_and_is_reported() {
        let communities: Vec<Id<CommunityMarker>> = (0..3).map(|_| Id::random()).collect();
        let mut posts = Vec::new();
        for &community in &communities {
            posts.extend(community_posts(community, 3));
        }

        let gateway = TestGateway::with_posts(posts);
        gateway.fail_community(communities[1]);
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let feed = composer
            .compose_home_feed(&mut store, Viewer::SignedIn(Id::random()), &communities)
            .await
            .unwrap();

        assert_eq!(feed.posts.len(), 6);
        assert_eq!(feed.failed_communities, [communities[1]]);
        assert!(
            feed.posts
                .iter()
                .all(|post| post.community_id != communities[1])
        );
    }

    #[tokio::test]
    async fn composing_rebuilds_the_ledger_from_annotations() {
        let community = Id::random();
        let user = Id::random();
        let mut posts = community_posts(community, 2);
        posts[0].current_user_vote = Some(VoteValue::Up);

        let gateway = TestGateway::with_posts(posts.clone());
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        composer
            .compose_home_feed(&mut store, Viewer::SignedIn(user), &[community])
            .await
            .unwrap();

        assert_eq!(store.own_vote(posts[0].id), Some(VoteValue::Up));
        assert_eq!(store.own_vote(posts[1].id), None);
    }

    #[tokio::test]
    async fn community_pages_fill_their_own_bucket() {
        let community = Id::random();
        let other = Id::random();
        let mut posts = community_posts(community, 2);
        posts.extend(community_posts(other, 1));

        let gateway = TestGateway::with_posts(posts.clone());
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let page = composer
            .load_community_feed(&mut store, community, Viewer::Anonymous)
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert_eq!(store.feed(FeedKey::Community(community)), page);
        assert!(store.feed(FeedKey::Community(other)).is_empty());
    }

    #[tokio::test]
    async fn opening_a_post_selects_it() {
        let post = testing::post(Id::random());
        let gateway = TestGateway::with_posts(vec![post.clone()]);
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let opened = composer
            .open_post(&mut store, post.id, Viewer::Anonymous)
            .await
            .unwrap();

        assert_eq!(opened.id, post.id);
        assert_eq!(store.selected().map(|selected| selected.id), Some(post.id));
    }

    #[tokio::test]
    async fn opening_a_missing_post_is_not_found() {
        let gateway = TestGateway::with_posts(Vec::new());
        let composer = FeedComposer::new(gateway);
        let mut store = PostStore::new();

        let result = composer
            .open_post(&mut store, Id::random(), Viewer::Anonymous)
            .await;

        assert!(matches!(result, Err(ClientError::NotFound)));
        assert_eq!(store.selected(), None);
    }
}
