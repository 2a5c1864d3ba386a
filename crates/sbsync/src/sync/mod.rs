//! Name reconciliation and flow registration against the cloud directory.

pub mod reconcile;
pub mod register;
mod syncer;

pub use reconcile::match_address;
pub use reconcile::reconcile;
pub use register::register_pending;
pub use register::RegistrationOptions;
pub use syncer::run;
pub use syncer::SyncError;
pub use syncer::SyncReport;
pub use syncer::Syncer;
