use crate::server::{Query, Result, ServerError, ServerRouter, json::Json};
use agora_common::model::{
    Acknowledged, Id,
    post::PostMarker,
    user::UserMarker,
    vote::{CastVote, VoteReceipt},
};
use agora_db::client::DbClient;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(cast_vote)
        .typed_delete(retract_vote)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/votes", rejection(ServerError))]
struct VotesPath();

/// Upsert on the unique (post, user) pair: casting replaces any previous
/// value, so retries converge on the same row.
async fn cast_vote(
    VotesPath(): VotesPath,
    State(db): State<Arc<DbClient>>,
    Json(cast): Json<CastVote>,
) -> Result<Json<VoteReceipt>> {
    let receipt = db.upsert_vote(cast.post_id, cast.user_id, cast.value).await?;

    Ok(Json(receipt))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetractVoteQuery {
    post_id: Id<PostMarker>,
    user_id: Id<UserMarker>,
}

/// Retracting a vote that does not exist succeeds; the reply is the same
/// either way.
async fn retract_vote(
    VotesPath(): VotesPath,
    State(db): State<Arc<DbClient>>,
    Query(params): Query<RetractVoteQuery>,
) -> Result<Json<Acknowledged>> {
    db.remove_vote(params.post_id, params.user_id).await?;

    Ok(Json(Acknowledged::ok()))
}
