use std::env;

use anyhow::Context;

/// Server configuration for HTTP listener
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl ServerConfig {
    /// Load server configuration from environment variables
    ///
    /// Environment variables:
    /// - SERVICE_IP: IP address to bind (default: "127.0.0.1")
    /// - SERVICE_PORT: Port to bind (default: 8080)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let ip = var("SERVICE_IP").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = match var("SERVICE_PORT") {
            Some(port) => port
                .trim()
                .parse()
                .with_context(|| format!("SERVICE_PORT is not a valid port: {port}"))?,
            None => 8080,
        };

        Ok(Self { ip, port })
    }

    /// Get the bind address as "ip:port"
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_create_bind_address_from_ip_and_port() {
        // Arrange
        let config = ServerConfig {
            ip: "0.0.0.0".to_string(),
            port: 3000,
        };

        // Act
        let address = config.bind_address();

        // Assert
        assert_eq!(address, "0.0.0.0:3000");
    }

    #[test]
    fn should_default_to_localhost_8080() {
        let config = ServerConfig::from_vars(|_| None).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn should_name_variable_when_port_is_invalid() {
        let err = ServerConfig::from_vars(|key| {
            (key == "SERVICE_PORT").then(|| "http".to_string())
        })
        .unwrap_err();

        assert!(err.to_string().contains("SERVICE_PORT"));
    }
}
