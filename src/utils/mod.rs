//! Supporting utilities: atomic file writes, logging setup and the progress spinner.

pub mod fs;
pub mod logging;
pub mod progress;

pub use fs::atomic_write;
pub use logging::init_logging;
pub use progress::ProgressBar;
