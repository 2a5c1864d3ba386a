pub mod address;
pub mod cloud;
pub mod config;
pub mod ha;
pub mod sync;

pub use cloud::Directory;
pub use config::Settings;
pub use sync::SyncError;
pub use sync::SyncReport;
