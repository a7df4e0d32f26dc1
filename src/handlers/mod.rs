pub mod dev;
pub mod public;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::payments::{CheckoutLookup, DevCheckouts};

#[derive(Clone)]
pub struct AppState {
    /// `None` when no payment provider is configured; verification then fails.
    pub checkouts: Option<Arc<dyn CheckoutLookup>>,
}

/// Full HTTP surface. Dev routes are mounted only when `dev` is given.
pub fn app(state: AppState, dev: Option<Arc<DevCheckouts>>) -> Router {
    let mut router = public::router().with_state(state);
    if let Some(dev) = dev {
        router = router.merge(dev::router(dev));
    }
    router.layer(TraceLayer::new_for_http())
}
