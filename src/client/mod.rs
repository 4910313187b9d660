use std::sync::Arc;

use tokio::sync::Mutex;

use crate::errors::Error;
use crate::gate::NetworkGate;
use crate::request_context::RequestDispatchContext;
use crate::strategy::AuthStrategy;

mod builder;
mod impls;
pub(crate) mod queue;

pub use builder::ApiBuilder;

use queue::RequestQueue;

/// Invoked once for every failed authenticate or refresh cycle.
pub type AuthFailureHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Authenticated request dispatcher.
///
/// Cheap to clone; clones share the token refresh state, so a 401 seen by any
/// clone parks requests issued through all of them until the refresh settles.
#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

pub(crate) struct ApiInner {
    context: RequestDispatchContext,
    strategy: AuthStrategy,
    queue: Mutex<RequestQueue>,
    gate: NetworkGate,
    on_auth_failure: Option<AuthFailureHandler>,
    propagate_errors: bool,
}
