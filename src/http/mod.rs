pub mod server;

pub use server::{http_server_service, ApiHandler, ApiRequest, ApiResponse, DEFAULT_PORT};
