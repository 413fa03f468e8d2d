pub mod config_port;
pub mod tick_port;
