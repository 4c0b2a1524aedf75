use crate::server::{Query, Result, ServerError, ServerRouter, json::Json};
use agora_common::model::{
    Acknowledged, Id,
    community::CommunityMarker,
    post::{CreatePost, Post, PostMarker},
    user::UserMarker,
};
use agora_db::client::DbClient;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPostsQuery {
    community_id: Option<Id<CommunityMarker>>,
    user_id: Option<Id<UserMarker>>,
}

async fn list_posts(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    Query(params): Query<ListPostsQuery>,
) -> Result<Json<Vec<Post>>> {
    let posts = db.list_posts(params.community_id, params.user_id).await?;

    Ok(Json(posts))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(db): State<Arc<DbClient>>,
    Json(post): Json<CreatePost>,
) -> Result<Json<Post>> {
    let post = db.create_post(&post).await?;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerQuery {
    user_id: Option<Id<UserMarker>>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
    Query(params): Query<ViewerQuery>,
) -> Result<Json<Post>> {
    let post = db
        .fetch_post(id, params.user_id)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Acknowledged>> {
    if !db.delete_post(id).await? {
        return Err(ServerError::PostByIdNotFound(id));
    }

    Ok(Json(Acknowledged::ok()))
}
