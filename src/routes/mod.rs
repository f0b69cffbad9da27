#![allow(clippy::needless_for_each)]
mod misc_handlers;
mod token_handlers;
use crate::{
    auth::{
        Identity, TokenPair, TokenType,
        middleware::{require_access, require_fresh_access, require_refresh},
    },
    config::CorsConfig,
    middleware::apply_axum_middleware,
    state::AppState,
};
use axum::{Json, Router, middleware, routing::get};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    info(title = "Authentication REST API", version = "v1"),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Token refresh, logout and revocation"),
    ),
    components(
        schemas(
            Identity,
            TokenPair,
            TokenType,
            token_handlers::MessageResponse,
            token_handlers::RevokeRequest,
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    // route_layer only wraps routes registered before it, so each credential
    // requirement gets its own group
    let access_routes = OpenApiRouter::new()
        .routes(routes!(token_handlers::whoami))
        .routes(routes!(token_handlers::logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_access,
        ));
    let fresh_routes = OpenApiRouter::new()
        .routes(routes!(token_handlers::revoke))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_fresh_access,
        ));
    let refresh_routes = OpenApiRouter::new()
        .routes(routes!(token_handlers::refresh))
        .routes(routes!(token_handlers::logout_refresh))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_refresh,
        ));

    let (api_routes, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        // Health endpoints (no auth required)
        .routes(routes!(misc_handlers::ping))
        .routes(routes!(misc_handlers::health))
        .merge(access_routes)
        .merge(fresh_routes)
        .merge(refresh_routes)
        .split_for_parts();

    let full_router = Router::new()
        .merge(api_routes)
        .merge(Scalar::with_url("/doc", openapi.clone()))
        .route("/openapi.json", get(|| async move { Json(openapi) }))
        .with_state(state);

    // Apply middleware
    apply_axum_middleware(full_router, cors)
}
