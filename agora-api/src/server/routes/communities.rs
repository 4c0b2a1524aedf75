use crate::server::{Query, Result, ServerError, ServerRouter, json::Json};
use agora_common::model::{
    Acknowledged, Id,
    community::{Community, CommunityMarker, CreateCommunity, Membership},
    user::UserMarker,
};
use agora_db::client::DbClient;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_COMMUNITY_LIMIT: i64 = 10;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_communities)
        .typed_post(create_community)
        .typed_get(get_community)
        .typed_post(join_community)
        .typed_delete(leave_community)
        .typed_get(user_communities)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/communities", rejection(ServerError))]
struct CommunitiesPath();

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
struct ListCommunitiesQuery {
    limit: Option<i64>,
}

async fn list_communities(
    CommunitiesPath(): CommunitiesPath,
    State(db): State<Arc<DbClient>>,
    Query(params): Query<ListCommunitiesQuery>,
) -> Result<Json<Vec<Community>>> {
    let limit = params.limit.unwrap_or(DEFAULT_COMMUNITY_LIMIT);
    let communities = db.list_communities(limit).await?;

    Ok(Json(communities))
}

async fn create_community(
    CommunitiesPath(): CommunitiesPath,
    State(db): State<Arc<DbClient>>,
    Json(community): Json<CreateCommunity>,
) -> Result<Json<Community>> {
    let community = db.create_community(&community).await?;

    Ok(Json(community))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/communities/{id}", rejection(ServerError))]
struct CommunityPath {
    id: Id<CommunityMarker>,
}

async fn get_community(
    CommunityPath { id }: CommunityPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Community>> {
    let community = db
        .fetch_community(id)
        .await?
        .ok_or(ServerError::CommunityByIdNotFound(id))?;

    Ok(Json(community))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/communities/{id}/members", rejection(ServerError))]
struct CommunityMembersPath {
    id: Id<CommunityMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinCommunity {
    user_id: Id<UserMarker>,
}

async fn join_community(
    CommunityMembersPath { id }: CommunityMembersPath,
    State(db): State<Arc<DbClient>>,
    Json(join): Json<JoinCommunity>,
) -> Result<Json<Membership>> {
    let membership = db.join_community(id, join.user_id).await?;

    Ok(Json(membership))
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeaveCommunityQuery {
    user_id: Id<UserMarker>,
}

async fn leave_community(
    CommunityMembersPath { id }: CommunityMembersPath,
    State(db): State<Arc<DbClient>>,
    Query(params): Query<LeaveCommunityQuery>,
) -> Result<Json<Acknowledged>> {
    db.leave_community(id, params.user_id).await?;

    Ok(Json(Acknowledged::ok()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{id}/communities", rejection(ServerError))]
struct UserCommunitiesPath {
    id: Id<UserMarker>,
}

async fn user_communities(
    UserCommunitiesPath { id }: UserCommunitiesPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Membership>>> {
    let memberships = db.joined_communities(id).await?;

    Ok(Json(memberships))
}
