use crate::server::ServerRouter;
use axum::Router;

mod comments;
mod communities;
mod posts;
mod users;
mod votes;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(posts::routes())
        .merge(votes::routes())
        .merge(communities::routes())
        .merge(comments::routes())
        .merge(users::routes())
}
