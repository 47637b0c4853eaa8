mod handlers;
mod response;
mod server;
mod tracing;

pub use response::{ApiError, ApiResponse};
pub use server::GatewayServer;
pub use tracing::{request_id_middleware, RequestContext, REQUEST_ID_HEADER};
