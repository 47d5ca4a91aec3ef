pub mod config;

pub use config::{PortalConfig, RevisionSettings};
