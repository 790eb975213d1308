//! Standard node library
//!
//! Generic nodes usable with any serializable event type. `register_all`
//! covers the nodes that work without constructor configuration; the field
//! router and the fan-out node carry per-workflow state (a routing table,
//! child nodes) and are registered via `NodeRegistry::register_fn`.

mod debug;
mod http;
mod parallel;
mod router;
mod time;
mod transform;

pub use debug::{DebugNode, DEBUG_NODE};
pub use http::{HttpFetchNode, HTTP_FETCH_NODE};
pub use parallel::{FanOutNode, FAN_OUT_NODE};
pub use router::{FieldRouter, FIELD_ROUTER};
pub use time::{DelayNode, DELAY_NODE};
pub use transform::{ExtractNode, EXTRACT_NODE};

use serde::Serialize;
use std::sync::Arc;
use strandruntime::NodeRegistry;

/// Register the configuration-free standard nodes.
pub fn register_all<E>(registry: &mut NodeRegistry<E>)
where
    E: Serialize + Send + Sync + 'static,
{
    registry.register(Arc::new(debug::DebugNodeFactory));
    registry.register(Arc::new(http::HttpFetchNodeFactory));
    registry.register(Arc::new(time::DelayNodeFactory));
    registry.register(Arc::new(transform::ExtractNodeFactory));
}
