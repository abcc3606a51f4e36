use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/newclients", client_routes())
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/admin", admin_routes())
        .nest("/analytics", analytics_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn client_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::client::list_clients,
            handlers::client::create_client
        ))
        .routes(routes!(
            handlers::client::get_client,
            handlers::client::update_client,
            handlers::client::delete_client
        ))
        .routes(routes!(handlers::client::get_client_history))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::user::list_users,
            handlers::user::create_user
        ))
        .routes(routes!(handlers::user::set_user_categories))
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::category::list_categories,
        handlers::category::create_category
    ))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::admin::get_stats))
}

fn analytics_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::analytics::get_analytics))
}
