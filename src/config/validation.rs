//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the upstream base URL is an absolute http(s) URL
//! - Check the chosen transport can reach that URL's scheme
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, TransportKind};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.base_url '{0}' is not an absolute http(s) URL")]
    BaseUrl(String),

    #[error("upstream.base_url '{0}' uses https, which requires transport = \"reqwest\"")]
    TlsTransport(String),

    #[error("{field} '{value}' is not a valid socket address")]
    Address { field: &'static str, value: String },

    #[error("routing.path_prefix '{0}' must start with '/'")]
    PathPrefix(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Check every semantic rule, collecting all failures.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            // The hyper transport runs on a plain TCP connector.
            if url.scheme() == "https" && config.upstream.transport == TransportKind::Hyper {
                errors.push(ValidationError::TlsTransport(config.upstream.base_url.clone()));
            }
        }
        _ => errors.push(ValidationError::BaseUrl(config.upstream.base_url.clone())),
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Address {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if !config.routing.path_prefix.starts_with('/') {
        errors.push(ValidationError::PathPrefix(config.routing.path_prefix.clone()));
    }

    let timeouts = [
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }

    if config.upstream.max_response_bytes == 0 {
        errors.push(ValidationError::Zero("upstream.max_response_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&ProxyConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = ProxyConfig::default();
        config.upstream.base_url = "ftp://files.example.com".into();
        config.listener.bind_address = "localhost".into();
        config.routing.path_prefix = "api".into();
        config.timeouts.connect_secs = 0;
        config.timeouts.upstream_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BaseUrl("ftp://files.example.com".into()),
                ValidationError::Address {
                    field: "listener.bind_address",
                    value: "localhost".into(),
                },
                ValidationError::PathPrefix("api".into()),
                ValidationError::Zero("timeouts.connect_secs"),
                ValidationError::Zero("timeouts.upstream_secs"),
            ]
        );

        config.upstream.base_url = "https://api.example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors[0],
            ValidationError::TlsTransport("https://api.example.com".into())
        );
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn test_https_needs_reqwest_transport() {
        let mut config = ProxyConfig::default();
        config.upstream.base_url = "https://api.example.com/v1".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::TlsTransport(
                "https://api.example.com/v1".into()
            )])
        );

        config.upstream.transport = TransportKind::Reqwest;
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
