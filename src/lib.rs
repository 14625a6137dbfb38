pub mod admission;
pub mod app_state;
pub mod client_pool;
pub mod config;
pub mod error;
pub mod io_struct;
pub mod language;
pub mod pipeline;
pub mod server;
pub mod services;
