use crate::acl::{HostSnapshot, PolicyBlock};
use crate::api::api_error::APIError;
use crate::api::server::AppState;
use crate::api::table::{self, Row, Table, LINE_DNS_COLUMNS, RESOLVER_COLUMNS};
use crate::error::Error;
use crate::forward::ForwardRule;
use crate::status::{LineDns, ResolverInstance};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/v1/ping", get(ping))
        .route("/v1/acl/ip/cidr", get(list_blocks).post(submit_block))
        .route(
            "/v1/acl/ip/cidr/:network/:netmask",
            get(list_block_hosts).delete(delete_block),
        )
        .route("/v1/acl/ip/pool", get(list_pool))
        .route("/v1/acl/ip/pool/:ip", get(host_policy))
        .route("/v1/forward/groups", get(list_groups))
        .route("/v1/forward/group", post(put_rule))
        .route("/v1/forward/group/:group", get(list_rules).delete(delete_group))
        .route(
            "/v1/forward/group/:group/:domain",
            get(get_rule).delete(delete_rule),
        )
        .route("/v1/smartdns", get(resolver_instances))
        .route("/v1/linedns", get(line_dns))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

fn update_done() -> Json<Value> {
    Json(json!({"mesg": "update done"}))
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

#[allow(clippy::unused_async)]
async fn ping() -> &'static str {
    "pong"
}

async fn list_blocks(
    State(state): State<AppState>,
) -> Result<Json<Table<Row<PolicyBlock>>>, APIError> {
    let blocks = state.acl.list_blocks().await?;
    Ok(Json(table::block_rows(blocks)))
}

async fn submit_block(
    State(state): State<AppState>,
    WithRejection(Json(block), _): WithRejection<Json<PolicyBlock>, Error>,
) -> Result<Json<Value>, APIError> {
    state.acl.submit_block(block).await?;
    Ok(update_done())
}

async fn list_block_hosts(
    State(state): State<AppState>,
    Path((network, netmask)): Path<(String, String)>,
) -> Result<Json<Table<Row<HostSnapshot>>>, APIError> {
    let snapshots = state
        .acl
        .list_host_snapshots_in_block(&format!("{network}/{netmask}"))
        .await?;
    Ok(Json(table::host_rows(snapshots)))
}

async fn delete_block(
    State(state): State<AppState>,
    Path((network, netmask)): Path<(String, String)>,
) -> Result<Json<Value>, APIError> {
    state.acl.delete_block(&format!("{network}/{netmask}")).await?;
    Ok(update_done())
}

async fn list_pool(
    State(state): State<AppState>,
) -> Result<Json<Table<Row<HostSnapshot>>>, APIError> {
    let snapshots = state.acl.list_all_host_snapshots().await?;
    Ok(Json(table::host_rows(snapshots)))
}

async fn host_policy(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Json<Table<Row<HostSnapshot>>>, APIError> {
    match state.acl.host_policy(&ip).await? {
        Some(snapshot) => Ok(Json(table::host_rows(vec![snapshot]))),
        None => Err(Error::NotFound(ip).into()),
    }
}

async fn list_groups(
    State(state): State<AppState>,
) -> Result<Json<Table<Row<ForwardRule>>>, APIError> {
    let groups = state.forward.list_groups().await?;
    Ok(Json(table::group_rows(groups)))
}

async fn put_rule(
    State(state): State<AppState>,
    WithRejection(Json(rule), _): WithRejection<Json<ForwardRule>, Error>,
) -> Result<Json<Value>, APIError> {
    state.forward.put_rule(rule).await?;
    Ok(update_done())
}

async fn list_rules(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<Table<Row<ForwardRule>>>, APIError> {
    let rules = state.forward.list_rules(&group).await?;
    Ok(Json(table::rule_rows(rules)))
}

async fn delete_group(
    State(state): State<AppState>,
    Path(group): Path<String>,
) -> Result<Json<Value>, APIError> {
    state.forward.delete_group(&group).await?;
    Ok(update_done())
}

async fn get_rule(
    State(state): State<AppState>,
    Path((group, domain)): Path<(String, String)>,
) -> Result<Json<Table<Row<ForwardRule>>>, APIError> {
    match state.forward.get_rule(&group, &domain).await? {
        Some(rule) => Ok(Json(table::rule_rows(vec![rule]))),
        None => Err(Error::NotFound(format!("{group}/{domain}")).into()),
    }
}

async fn delete_rule(
    State(state): State<AppState>,
    Path((group, domain)): Path<(String, String)>,
) -> Result<Json<Value>, APIError> {
    state.forward.delete_rule(&group, &domain).await?;
    Ok(update_done())
}

async fn resolver_instances(
    State(state): State<AppState>,
) -> Result<Json<Table<ResolverInstance>>, APIError> {
    let instances = state.status.resolver_instances().await?;
    Ok(Json(Table::new(instances, RESOLVER_COLUMNS)))
}

async fn line_dns(State(state): State<AppState>) -> Result<Json<Table<LineDns>>, APIError> {
    let lines = state.status.line_dns().await?;
    Ok(Json(Table::new(lines, LINE_DNS_COLUMNS)))
}
