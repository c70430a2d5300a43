//! gallery-core: transport-agnostic building blocks for the gallery asset gateway.

pub mod cache;
pub mod config;
pub mod errors;
pub mod logging;
pub mod origin;
pub mod transform;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::{GalleryConfig, GalleryConfigSnapshot, GatewayConfig};
pub use errors::{ErrorKind, GalleryError};
pub use logging::{GatewayLogger, LogLevel, LogRecord, MemoryLogger, TracingLogger};
pub use origin::{ExecutionContext, ForwardedHeaders, OriginResolver};
pub use transform::{AssetUrls, FitMode, ImageFormat, TransformOptions};
