use crate::acl::AclService;
use crate::api::routes;
use crate::config::SharedConfig;
use crate::forward::ForwardService;
use crate::kv_store::{DynKvStore, StoreClient};
use crate::status::StatusService;
use axum::Router;
use std::future::Future;

#[derive(Clone)]
pub(super) struct AppState {
    pub config: SharedConfig,
    pub acl: AclService,
    pub forward: ForwardService,
    pub status: StatusService,
}

impl AppState {
    fn new(config: SharedConfig, kv_store: DynKvStore) -> Self {
        let store = StoreClient::new(kv_store);
        let timeouts = config.timeouts();
        AppState {
            acl: AclService::new(store.clone(), timeouts, config.max_block_hosts),
            forward: ForwardService::new(store.clone(), timeouts),
            status: StatusService::new(store, timeouts),
            config,
        }
    }
}

/// The API's routes bound to `kv_store`, without a listener.
pub fn router(config: SharedConfig, kv_store: DynKvStore) -> Router {
    routes::new(AppState::new(config, kv_store))
}

pub fn new(
    config: SharedConfig,
    kv_store: DynKvStore,
) -> impl Future<Output = hyper::Result<()>> {
    let bind_addr = config.api_bind_addr;
    axum::Server::bind(&bind_addr).serve(router(config, kv_store).into_make_service())
}
