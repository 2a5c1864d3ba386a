mod error;
mod options;
mod settings;

pub use error::ConfigError;
pub use options::supervisor_token;
pub use options::Credentials;
pub use settings::*;
