pub mod headers;
pub mod middleware;
