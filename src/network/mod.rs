pub mod broadcast;
pub mod connection_handler;
pub mod connection_manager;
pub mod http;
pub mod messages;
pub mod relay;
pub mod server;
