pub mod config;
pub mod forwarder;
pub mod proto;
pub mod server;
pub mod upstream;
