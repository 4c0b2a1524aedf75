use crate::server::{Result, ServerError, ServerRouter, json::Json};
use agora_common::model::{
    Acknowledged, Id,
    comment::{Comment, CommentMarker, CreateComment},
    post::PostMarker,
};
use agora_db::client::DbClient;
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_comments)
        .typed_post(create_comment)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct PostCommentsPath {
    id: Id<PostMarker>,
}

async fn list_comments(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Vec<Comment>>> {
    let comments = db.list_comments(id).await?;

    Ok(Json(comments))
}

async fn create_comment(
    PostCommentsPath { id }: PostCommentsPath,
    State(db): State<Arc<DbClient>>,
    Json(comment): Json<CreateComment>,
) -> Result<Json<Comment>> {
    let comment = db
        .create_comment(id, &comment)
        .await?
        .ok_or(ServerError::PostByIdNotFound(id))?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

async fn delete_comment(
    CommentPath { id }: CommentPath,
    State(db): State<Arc<DbClient>>,
) -> Result<Json<Acknowledged>> {
    if !db.delete_comment(id).await? {
        return Err(ServerError::CommentByIdNotFound(id));
    }

    Ok(Json(Acknowledged::ok()))
}
