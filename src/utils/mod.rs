pub mod config_watcher;
pub mod headers;
pub mod logging;

pub use config_watcher::*;
pub use headers::*;
pub use logging::*;
