pub mod audio;
pub mod config;
pub mod error;
pub mod event;
pub mod playback;
pub mod segment;
pub mod session;
pub mod transport;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use session::SessionCoordinator;
