//! Hostname lookup for the `/` greeting.

use obsdemo_core::error::{ObsDemoError, Result};

pub trait HostnameProvider: Send + Sync {
    fn hostname(&self) -> Result<String>;
}

/// Asks the OS on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHostname;

impl HostnameProvider for SystemHostname {
    fn hostname(&self) -> Result<String> {
        sysinfo::System::host_name()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ObsDemoError::Internal("hostname unavailable".into()))
    }
}

/// Fixed name, for tests and containers that want a stable label.
#[derive(Debug, Clone)]
pub struct StaticHostname(pub String);

impl HostnameProvider for StaticHostname {
    fn hostname(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}
