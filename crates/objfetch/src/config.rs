//! The caller-supplied configuration mapping.
//!
//! `FetchConfig` forwards unrecognized keys untouched to the underlying
//! adapter, while giving the few recognized keys typed accessors so adapters
//! never parse raw strings themselves.

use std::collections::HashMap;

use crate::pipeline::bounds::Bounds;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

/// Configuration mapping passed to `open(config)`, plus the concurrency
/// bounds (overridable for load testing, defaulting to production values).
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    values: HashMap<String, ConfigValue>,
    pub bounds: Bounds,
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn str_opt(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ConfigValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn bool_opt(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(ConfigValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// `anon` (bool): force anonymous access; default false.
    pub fn anon(&self) -> bool {
        self.bool_opt("anon").unwrap_or(false)
    }

    pub fn aws_endpoint_url(&self) -> Option<&str> {
        self.str_opt("aws_endpoint_url")
    }

    pub fn aws_key(&self) -> Option<&str> {
        self.str_opt("aws_key")
    }

    pub fn aws_secret(&self) -> Option<&str> {
        self.str_opt("aws_secret")
    }

    pub fn aws_token(&self) -> Option<&str> {
        self.str_opt("aws_token")
    }

    pub fn region_name(&self) -> Option<&str> {
        self.str_opt("region_name")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_keys_have_typed_accessors() {
        let cfg = FetchConfig::new()
            .set("anon", true)
            .set("region_name", "us-west-2")
            .set("extra_transport_key", "forwarded-as-is");

        assert!(cfg.anon());
        assert_eq!(cfg.region_name(), Some("us-west-2"));
        assert_eq!(
            cfg.str_opt("extra_transport_key"),
            Some("forwarded-as-is")
        );
    }

    #[test]
    fn unset_anon_defaults_to_false() {
        assert!(!FetchConfig::new().anon());
    }
}
