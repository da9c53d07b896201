pub mod los_config;

pub use self::los_config::*;
