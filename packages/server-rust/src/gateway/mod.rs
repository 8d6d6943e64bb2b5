//! Request/response plumbing shared by every key-bearing endpoint.
//!
//! Each handler runs the same five steps: decode the request, derive the
//! [`TenantScope`] and prefix outbound keys, [`dispatch`] the RPC call,
//! strip the prefix from returned keys, and [`encode_json`] the result.

pub mod call;
pub mod error;
pub mod scope;

pub use call::{decode_body, dispatch, encode_json};
pub use error::GatewayError;
pub use scope::{isolation_requested, RequestScope, TenantScope, ISOLATION_PARAM};
