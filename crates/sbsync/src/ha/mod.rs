//! Home Assistant support.
//!
//! The device registry and config flow listings go through the websocket API
//! (one authenticated connection per command); flow confirmation goes through
//! the REST API.

pub mod flow;
pub mod platform;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;

pub use flow::FlowClient;
pub use flow::FlowOutcome;
pub use flow::RegistrationError;
pub use platform::HomeAssistant;
pub use platform::Platform;
pub use protocol::ControlPlaneError;
pub use registry::DeviceEntry;
pub use registry::FlowEntry;
pub use session::ControlPlane;
pub use transport::WsConnector;
