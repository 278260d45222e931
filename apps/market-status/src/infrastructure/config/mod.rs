//! Configuration module.

mod settings;

pub use settings::{
    ApiToken, CalendarSettings, ConfigError, ServerSettings, ServiceConfig, WebSocketSettings,
};
