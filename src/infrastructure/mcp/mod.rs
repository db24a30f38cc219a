//! MCP server surface: JSON-RPC endpoint, tool dispatch, coercion.

pub mod coerce;
pub mod dispatcher;
pub mod http_server;
pub mod response;
pub mod tools;
pub mod types;

pub use dispatcher::ServerState;
pub use http_server::{build_router, build_state, serve};
pub use response::{ResponseStatus, StandardResponse};
