mod settings;

pub use settings::{
    CacheConfig, DEFAULT_NOTIFICATION_PATTERN, ExportConfig, RetryConfig, Settings, SlackConfig,
    load_settings,
};
