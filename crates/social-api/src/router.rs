use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::middleware::{log_request, require_auth};
use crate::{follows, posts, users};

/// Every route. Only login and registration skip authentication.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/users", post(users::create_user));

    let protected_routes = Router::new()
        .route("/users", get(users::search_users))
        .route("/users/update-password", post(users::update_password))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/follow", post(follows::follow))
        .route("/users/{id}/unfollow", post(follows::unfollow))
        .route("/users/{id}/followers", get(follows::followers))
        .route("/users/{id}/following", get(follows::following))
        .route("/users/{id}/posts", get(posts::get_posts_by_user))
        .route("/posts", post(posts::create_post).get(posts::feed))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/like", post(posts::like_post))
        .route("/posts/{id}/unlike", post(posts::unlike_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
