//! Process-wide namespace registry
//!
//! Pairs the Prometheus [`Registry`] with the set of claimed namespaces. The
//! set sits behind a single mutex that is only held for check-and-insert.
//! Pass one `NamespaceRegistry` to every facade that should share an export
//! surface; there is no implicit global.

use crate::error::MetricsError;
use prometheus::{Encoder, Registry, TextEncoder};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct NamespaceRegistry {
    registry: Registry,
    namespaces: Arc<Mutex<HashSet<String>>>,
}

impl NamespaceRegistry {
    /// Create an empty registry with a fresh Prometheus registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prometheus(&self) -> &Registry {
        &self.registry
    }

    /// Validate and claim `namespace`
    ///
    /// # Errors
    ///
    /// - `InvalidNamespace` if the name cannot be used as a metric-name prefix
    /// - `DuplicateNamespace` if it was claimed before
    /// - `RegistryPoisoned` if a thread panicked while holding the lock
    pub fn claim(&self, namespace: &str) -> Result<(), MetricsError> {
        validate_namespace(namespace)?;

        let mut namespaces = self
            .namespaces
            .lock()
            .map_err(|_| MetricsError::RegistryPoisoned)?;

        if !namespaces.insert(namespace.to_string()) {
            return Err(MetricsError::DuplicateNamespace {
                namespace: namespace.to_string(),
            });
        }

        tracing::debug!(namespace, "Claimed metrics namespace");
        Ok(())
    }

    /// Give a namespace back, e.g. when collector registration failed after a claim
    pub(crate) fn release(&self, namespace: &str) {
        if let Ok(mut namespaces) = self.namespaces.lock() {
            namespaces.remove(namespace);
        }
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces
            .lock()
            .map(|namespaces| namespaces.contains(namespace))
            .unwrap_or(false)
    }

    /// Render every registered collector in Prometheus text format
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Metrics output is not valid UTF-8: {}", e))
        })
    }
}

/// Namespaces become part of metric names, so they must match `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn validate_namespace(namespace: &str) -> Result<(), MetricsError> {
    let invalid = |reason: &str| MetricsError::InvalidNamespace {
        namespace: namespace.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = namespace.chars().next() else {
        return Err(invalid("namespace must not be empty"));
    };

    if first.is_ascii_digit() {
        return Err(invalid("namespace must not start with a digit"));
    }

    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid(
            "namespace may only contain ASCII letters, digits and '_'",
        ));
    }

    Ok(())
}
