use crate::utils::error::{Result, UnitError};
use crate::utils::validation::{self, Validate};

/// Runtime settings of the shortener service, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    pub protocol: String,
    pub service_domain: String,
    pub api_port: u16,
    pub link_length: usize,
    /// JSON file backing the link store. In-memory when unset.
    pub store_path: Option<String>,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            service_domain: "localhost:8080".to_string(),
            api_port: 8080,
            link_length: 5,
            store_path: None,
        }
    }
}

impl ServiceSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_port = match lookup("API_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|e| UnitError::InvalidConfigValueError {
                field: "API_PORT".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.api_port,
        };

        let link_length = match lookup("LINK_LENGTH") {
            Some(raw) => raw.parse::<usize>().map_err(|e| UnitError::InvalidConfigValueError {
                field: "LINK_LENGTH".to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => defaults.link_length,
        };

        let settings = Self {
            protocol: lookup("PROTOCOL").unwrap_or(defaults.protocol),
            service_domain: lookup("SERVICE_DOMAIN").unwrap_or(defaults.service_domain),
            api_port,
            link_length,
            store_path: lookup("STORE_PATH").filter(|p| !p.trim().is_empty()),
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for ServiceSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("PROTOCOL", &self.protocol)?;
        validation::validate_non_empty_string("SERVICE_DOMAIN", &self.service_domain)?;
        validation::validate_range("API_PORT", self.api_port, 1, u16::MAX)?;
        validation::validate_positive_number("LINK_LENGTH", self.link_length, 1)?;
        if let Some(path) = &self.store_path {
            validation::validate_path("STORE_PATH", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = ServiceSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, ServiceSettings::default());
    }

    #[test]
    fn test_reads_all_variables() {
        let settings = ServiceSettings::from_lookup(lookup_from(&[
            ("PROTOCOL", "https"),
            ("SERVICE_DOMAIN", "sho.rt"),
            ("API_PORT", "9000"),
            ("LINK_LENGTH", "7"),
            ("STORE_PATH", "/var/lib/links.json"),
        ]))
        .unwrap();

        assert_eq!(settings.protocol, "https");
        assert_eq!(settings.service_domain, "sho.rt");
        assert_eq!(settings.api_port, 9000);
        assert_eq!(settings.link_length, 7);
        assert_eq!(settings.store_path.as_deref(), Some("/var/lib/links.json"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(ServiceSettings::from_lookup(lookup_from(&[("API_PORT", "http")])).is_err());
        assert!(ServiceSettings::from_lookup(lookup_from(&[("LINK_LENGTH", "0")])).is_err());
    }
}
