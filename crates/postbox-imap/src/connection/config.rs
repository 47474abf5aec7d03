//! Connection configuration types.

use std::time::Duration;

use crate::parser::UnknownStatus;

/// Connection security mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// No encryption (port 143). **Not recommended for production.**
    None,
    /// TLS from the start (port 993). **Recommended.**
    #[default]
    Implicit,
}

impl Security {
    /// Returns the default port for this security mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 143,
            Self::Implicit => 993,
        }
    }
}

/// IMAP connection configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Security mode.
    pub security: Security,
    /// Timeout for opening the connection and reading the greeting.
    pub connect_timeout: Duration,
    /// Prefix for generated command tags.
    pub tag_prefix: char,
    /// Handling of tagged lines without a status word.
    pub unknown_status: UnknownStatus,
}

impl Config {
    /// Creates a new configuration with implicit TLS on port 993.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Creates a configuration builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for connection configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    tag_prefix: char,
    unknown_status: UnknownStatus,
}

impl ConfigBuilder {
    /// Creates a new builder with the given hostname.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            tag_prefix: 'A',
            unknown_status: UnknownStatus::default(),
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the tag prefix.
    #[must_use]
    pub const fn tag_prefix(mut self, prefix: char) -> Self {
        self.tag_prefix = prefix;
        self
    }

    /// Sets the policy for tagged lines with an unknown status word.
    #[must_use]
    pub const fn unknown_status(mut self, policy: UnknownStatus) -> Self {
        self.unknown_status = policy;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            tag_prefix: self.tag_prefix,
            unknown_status: self.unknown_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_config_new() {
        let config = Config::new("imap.example.com");
        assert_eq!(config.host, "imap.example.com");
        assert_eq!(config.port, 993);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.tag_prefix, 'A');
        assert_eq!(config.unknown_status, UnknownStatus::Reject);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder("imap.example.com")
            .port(1993)
            .connect_timeout(Duration::from_secs(10))
            .tag_prefix('T')
            .unknown_status(UnknownStatus::Ignore)
            .build();

        assert_eq!(config.port, 1993);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.tag_prefix, 'T');
        assert_eq!(config.unknown_status, UnknownStatus::Ignore);
    }

    #[test]
    fn test_config_builder_default_port() {
        let config = Config::builder("localhost")
            .security(Security::None)
            .build();

        assert_eq!(config.port, 143);
    }
}
