pub use app_error::{AppError, AppResult};
pub use self::config::{BackOffConfig, ListenerConfig, ProcessorConfig, ENV_PREFIX};
pub use tracing_config::{setup_local_tracing, setup_tracing};

mod app_error;
mod config;
mod tracing_config;
