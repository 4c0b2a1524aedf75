//! In-memory [`PostGateway`] fake and fixture helpers for the client tests.

use crate::gateway::{GatewayError, PostGateway, Result};
use agora_common::model::{
    Id,
    community::{CommunityMarker, Membership},
    post::{Post, PostMarker, PostTitle},
    user::UserMarker,
    vote::{VoteMarker, VoteReceipt, VoteValue},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use time::macros::utc_datetime;

pub(crate) fn post(community_id: Id<CommunityMarker>) -> Post {
    Post {
        id: Id::random(),
        community_id,
        creator_id: Id::random(),
        title: PostTitle::new("A post".to_owned()).unwrap(),
        body: String::new(),
        number_of_comments: 0,
        net_score: 0,
        current_user_vote: None,
        created_at: utc_datetime!(2026-01-15 12:00),
    }
}

#[derive(Default)]
struct TestGatewayState {
    posts: Vec<Post>,
    votes: HashMap<(Id<PostMarker>, Id<UserMarker>), (Id<VoteMarker>, VoteValue)>,
    failing_communities: HashSet<Id<CommunityMarker>>,
    fail_votes: bool,
    fail_deletes: bool,
    vote_calls: usize,
}

/// Shared-state gateway double: posts are served from a fixed set, votes are
/// recorded like the server ledger would, and individual operations can be
/// made to fail.
#[derive(Clone, Default)]
pub(crate) struct TestGateway {
    state: Arc<Mutex<TestGatewayState>>,
}

impl TestGateway {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        let gateway = Self::default();
        gateway.state.lock().unwrap().posts = posts;
        gateway
    }

    pub fn fail_votes(&self) {
        self.state.lock().unwrap().fail_votes = true;
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn fail_community(&self, community_id: Id<CommunityMarker>) {
        self.state
            .lock()
            .unwrap()
            .failing_communities
            .insert(community_id);
    }

    pub fn vote_calls(&self) -> usize {
        self.state.lock().unwrap().vote_calls
    }

    pub fn recorded_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
    ) -> Option<VoteValue> {
        self.state
            .lock()
            .unwrap()
            .votes
            .get(&(post_id, user_id))
            .map(|(_, value)| *value)
    }
}

fn annotate(state: &TestGatewayState, post: &Post, viewer: Option<Id<UserMarker>>) -> Post {
    let mut post = post.clone();
    post.net_score += state
        .votes
        .iter()
        .filter(|((voted_post, _), _)| *voted_post == post.id)
        .map(|(_, (_, value))| value.score())
        .sum::<i64>();
    if let Some(viewer) = viewer
        && let Some((_, value)) = state.votes.get(&(post.id, viewer))
    {
        post.current_user_vote = Some(*value);
    }
    post
}

#[async_trait]
impl PostGateway for TestGateway {
    async fn list_posts(
        &self,
        community_id: Option<Id<CommunityMarker>>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Vec<Post>> {
        let state = self.state.lock().unwrap();

        if let Some(community_id) = community_id
            && state.failing_communities.contains(&community_id)
        {
            return Err(GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }

        Ok(state
            .posts
            .iter()
            .filter(|post| community_id.is_none_or(|community| post.community_id == community))
            .map(|post| annotate(&state, post, viewer))
            .collect())
    }

    async fn fetch_post(
        &self,
        post_id: Id<PostMarker>,
        viewer: Option<Id<UserMarker>>,
    ) -> Result<Post> {
        let state = self.state.lock().unwrap();

        state
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .map(|post| annotate(&state, post, viewer))
            .ok_or(GatewayError::Status(StatusCode::NOT_FOUND))
    }

    async fn delete_post(&self, post_id: Id<PostMarker>) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        if state.fail_deletes {
            return Err(GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }

        let before = state.posts.len();
        state.posts.retain(|post| post.id != post_id);
        if state.posts.len() == before {
            return Err(GatewayError::Status(StatusCode::NOT_FOUND));
        }

        Ok(())
    }

    async fn cast_vote(
        &self,
        post_id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        value: VoteValue,
    ) -> Result<VoteReceipt> {
        let mut state = self.state.lock().unwrap();
        state.vote_calls += 1;

        if state.fail_votes {
            return Err(GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }

        // Upsert semantics: the row id survives a value change.
        let entry = state
            .votes
            .entry((post_id, user_id))
            .or_insert((Id::random(), value));
        entry.1 = value;

        Ok(VoteReceipt {
            id: entry.0,
            value,
        })
    }

    async fn retract_vote(&self, post_id: Id<PostMarker>, user_id: Id<UserMarker>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.vote_calls += 1;

        if state.fail_votes {
            return Err(GatewayError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }

        state.votes.remove(&(post_id, user_id));
        Ok(())
    }

    async fn joined_communities(&self, _user_id: Id<UserMarker>) -> Result<Vec<Membership>> {
        Ok(Vec::new())
    }
}
