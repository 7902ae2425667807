//! HTTP boundary: routes, bearer authentication and response mapping.
//!
//! Gateway calls run on their own tokio task, so a client that hangs up
//! does not cut an audited operation short.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, FromRequestParts, Path, RawQuery, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{delete, get};
use axum::{Json, Router};
use provctl_auth::{AuthConfig, AuthError, PermissionChecker};
use provctl_core::authz::Authorizer;
use provctl_core::error::ProvError;
use provctl_core::models::audit::AuditEvent;
use provctl_core::models::cluster::Cluster;
use provctl_core::models::pool::Pool;
use provctl_core::models::resource::Resource;
use provctl_core::models::token::Token;
use provctl_core::repository::{AuditEventRepository, ResourceStore};
use provctl_db::{StoreOptions, SurrealAuditEventRepository, SurrealResourceStore};
use surrealdb::{Connection, Surreal};
use tracing::debug;

use crate::audit::panic_error;
use crate::classify::{Failure, Reply};
use crate::gateway::{EventGateway, ResourceGateway};

/// Per-router state: one gateway plus the token verification settings.
pub struct ApiState<G> {
    gateway: Arc<G>,
    auth: Arc<AuthConfig>,
}

impl<G> ApiState<G> {
    pub fn new(gateway: G, auth: Arc<AuthConfig>) -> Self {
        Self {
            gateway: Arc::new(gateway),
            auth,
        }
    }
}

impl<G> Clone for ApiState<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            auth: Arc::clone(&self.auth),
        }
    }
}

impl<G> FromRef<ApiState<G>> for Arc<AuthConfig> {
    fn from_ref(state: &ApiState<G>) -> Self {
        Arc::clone(&state.auth)
    }
}

/// The authenticated caller, taken from an `Authorization: Bearer` header.
pub struct Caller(pub Token);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    Arc<AuthConfig>: FromRef<S>,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = Arc::<AuthConfig>::from_ref(state);
        let raw = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AuthError::MissingToken)
            .map_err(ProvError::from)?;

        let token = provctl_auth::authenticate(raw.trim(), &auth).map_err(|e| {
            debug!(error = %e, "Bearer token rejected");
            ProvError::from(e)
        })?;
        Ok(Caller(token))
    }
}

/// Run `task` to completion on its own tokio task.
async fn run<T, F>(task: F) -> Reply<T>
where
    T: Send + 'static,
    F: Future<Output = Reply<T>> + Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(reply) => reply,
        Err(e) => match e.try_into_panic() {
            Ok(payload) => Reply::failed(panic_error(&*payload)),
            Err(e) => Reply::failed(ProvError::Internal(e.to_string())),
        },
    }
}

pub type ResourceState<R, S, E, A> = ApiState<ResourceGateway<R, S, E, A>>;

async fn upsert_resource<R, S, E, A>(
    State(state): State<ResourceState<R, S, E, A>>,
    Caller(token): Caller,
    body: Bytes,
) -> Reply<StatusCode>
where
    R: Resource,
    S: ResourceStore<R> + 'static,
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    let gateway = Arc::clone(&state.gateway);
    run(async move { gateway.create_or_update(&token, &body).await })
        .await
        .map(|()| StatusCode::OK)
}

async fn list_resources<R, S, E, A>(
    State(state): State<ResourceState<R, S, E, A>>,
    Caller(token): Caller,
) -> Reply<Json<Vec<R>>>
where
    R: Resource,
    S: ResourceStore<R> + 'static,
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    let gateway = Arc::clone(&state.gateway);
    run(async move { gateway.list(&token).await })
        .await
        .map(Json)
}

async fn delete_resource<R, S, E, A>(
    State(state): State<ResourceState<R, S, E, A>>,
    Caller(token): Caller,
    Path(name): Path<String>,
    RawQuery(query): RawQuery,
) -> Reply<StatusCode>
where
    R: Resource,
    S: ResourceStore<R> + 'static,
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    let gateway = Arc::clone(&state.gateway);
    let query = query.unwrap_or_default();
    run(async move { gateway.delete(&token, &name, query.as_bytes()).await })
        .await
        .map(|()| StatusCode::OK)
}

async fn list_events<E, A>(
    State(state): State<ApiState<EventGateway<E, A>>>,
    Caller(token): Caller,
    RawQuery(query): RawQuery,
) -> Reply<Json<Vec<AuditEvent>>>
where
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    let gateway = Arc::clone(&state.gateway);
    let query = query.unwrap_or_default();
    run(async move { gateway.list(&token, query.as_bytes()).await })
        .await
        .map(Json)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Routes for one resource kind mounted at `path`.
pub fn resource_routes<R, S, E, A>(path: &str, state: ResourceState<R, S, E, A>) -> Router
where
    R: Resource,
    S: ResourceStore<R> + 'static,
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    Router::new()
        .route(
            path,
            get(list_resources::<R, S, E, A>).post(upsert_resource::<R, S, E, A>),
        )
        .route(
            &format!("{path}/{{name}}"),
            delete(delete_resource::<R, S, E, A>),
        )
        .with_state(state)
}

pub fn event_routes<E, A>(state: ApiState<EventGateway<E, A>>) -> Router
where
    E: AuditEventRepository + 'static,
    A: Authorizer + 'static,
{
    Router::new()
        .route("/events", get(list_events::<E, A>))
        .with_state(state)
}

/// The full API backed by SurrealDB, authorizing with the permissions
/// carried in each caller's token.
pub fn router<C: Connection>(db: Surreal<C>, auth: AuthConfig, options: StoreOptions) -> Router {
    let auth = Arc::new(auth);
    let events = Arc::new(SurrealAuditEventRepository::new(db.clone()));

    let clusters = ResourceGateway::new(
        Arc::new(SurrealResourceStore::<C, Cluster>::with_options(
            db.clone(),
            options.clone(),
        )),
        Arc::clone(&events),
        PermissionChecker,
    );
    let pools = ResourceGateway::new(
        Arc::new(SurrealResourceStore::<C, Pool>::with_options(db, options)),
        Arc::clone(&events),
        PermissionChecker,
    );

    Router::new()
        .route("/healthz", get(healthz))
        .merge(resource_routes(
            "/provisioner/clusters",
            ApiState::new(clusters, Arc::clone(&auth)),
        ))
        .merge(resource_routes(
            "/pools",
            ApiState::new(pools, Arc::clone(&auth)),
        ))
        .merge(event_routes(ApiState::new(
            EventGateway::new(events, PermissionChecker),
            auth,
        )))
}
