pub mod app;
pub mod coverage;
pub mod handlers;
pub mod server;
