//! SwitchBot cloud API: request signing and the device directory.

mod client;
pub mod sign;

pub use client::CloudApiError;
pub use client::CloudClient;
pub use client::CloudDevice;
pub use client::Directory;
pub use sign::SignedHeaders;
