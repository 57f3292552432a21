use axum::Router;

pub mod node;

use crate::ServiceState;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .nest("/node", node::router(state.clone()))
        .with_state(state)
}
