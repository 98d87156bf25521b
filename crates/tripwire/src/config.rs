// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Environment overrides for the compiled-in endpoint.

use thiserror::Error;
use tripwire_core::EndpointConfig;

/// Replaces the build-selected DSN. An empty value disables delivery.
pub const ENV_DSN: &str = "TRIPWIRE_DSN";
/// Environment name attached to events.
pub const ENV_ENVIRONMENT: &str = "TRIPWIRE_ENVIRONMENT";
/// Enables SDK debug output.
pub const ENV_DEBUG: &str = "TRIPWIRE_DEBUG";
/// Keeps events in memory instead of sending them.
pub const ENV_DISABLED: &str = "TRIPWIRE_DISABLED";

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("invalid value for {var}: {value:?}")]
	InvalidValue { var: &'static str, value: String },
}

/// Runtime overrides read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShimConfig {
	pub dsn: Option<String>,
	pub environment: Option<String>,
	pub debug: bool,
	pub disabled: bool,
}

impl ShimConfig {
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| std::env::var(var).ok())
	}

	/// Read overrides through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let dsn = lookup(ENV_DSN).map(|v| v.trim().to_string());

		let environment = lookup(ENV_ENVIRONMENT)
			.map(|v| v.trim().to_string())
			.filter(|v| !v.is_empty());

		let debug = match lookup(ENV_DEBUG) {
			Some(value) => parse_flag(ENV_DEBUG, &value)?,
			None => false,
		};

		let disabled = match lookup(ENV_DISABLED) {
			Some(value) => parse_flag(ENV_DISABLED, &value)?,
			None => false,
		};

		Ok(Self {
			dsn,
			environment,
			debug,
			disabled,
		})
	}

	/// Apply the overrides on top of a build-selected endpoint.
	pub fn apply(&self, mut endpoint: EndpointConfig) -> EndpointConfig {
		if let Some(dsn) = &self.dsn {
			endpoint = endpoint.with_dsn(dsn.clone());
		}
		if let Some(environment) = &self.environment {
			endpoint = endpoint.with_environment(environment.clone());
		}
		if self.debug {
			endpoint = endpoint.with_debug(true);
		}
		endpoint
	}
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
	match value.trim().to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"" | "0" | "false" | "no" | "off" => Ok(false),
		_ => Err(ConfigError::InvalidValue {
			var,
			value: value.to_string(),
		}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use std::collections::HashMap;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> = pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |var| map.get(var).cloned()
	}

	#[test]
	fn empty_environment_yields_defaults() {
		let config = ShimConfig::from_lookup(lookup_from(&[])).unwrap();
		assert_eq!(config, ShimConfig::default());
	}

	#[test]
	fn reads_all_overrides() {
		let config = ShimConfig::from_lookup(lookup_from(&[
			(ENV_DSN, "https://key@collector.local/1"),
			(ENV_ENVIRONMENT, " staging "),
			(ENV_DEBUG, "TRUE"),
			(ENV_DISABLED, "0"),
		]))
		.unwrap();

		assert_eq!(config.dsn.as_deref(), Some("https://key@collector.local/1"));
		assert_eq!(config.environment.as_deref(), Some("staging"));
		assert!(config.debug);
		assert!(!config.disabled);
	}

	#[test]
	fn rejects_unparseable_flag() {
		let result = ShimConfig::from_lookup(lookup_from(&[(ENV_DEBUG, "maybe")]));
		assert!(matches!(
			result,
			Err(ConfigError::InvalidValue { var: ENV_DEBUG, .. })
		));
	}

	#[test]
	fn apply_overrides_selected_endpoint() {
		let config = ShimConfig {
			dsn: Some(String::new()),
			environment: Some("ci".to_string()),
			debug: true,
			disabled: false,
		};
		let endpoint = config.apply(EndpointConfig::select(false, "1.0.0-local"));

		assert_eq!(endpoint.dsn, "");
		assert_eq!(endpoint.environment.as_deref(), Some("ci"));
		assert!(endpoint.debug);
		assert_eq!(endpoint.release, "1.0.0-local");
	}

	#[test]
	fn apply_without_overrides_keeps_endpoint() {
		let selected = EndpointConfig::select(true, "1.0.0-local");
		assert_eq!(ShimConfig::default().apply(selected.clone()), selected);
	}

	proptest! {
		#[test]
		fn flags_ignore_case_and_padding(
			word in prop::sample::select(vec!["1", "true", "yes", "on", "0", "false", "no", "off"]),
			upper in any::<bool>(),
			pad in "[ \t]{0,3}",
		) {
			let value = if upper { word.to_uppercase() } else { word.to_string() };
			let parsed = parse_flag(ENV_DEBUG, &format!("{pad}{value}{pad}")).unwrap();
			prop_assert_eq!(parsed, matches!(word, "1" | "true" | "yes" | "on"));
		}

		#[test]
		fn unknown_flags_are_rejected(value in "[a-z]{2,8}") {
			prop_assume!(!matches!(value.as_str(), "true" | "yes" | "on" | "false" | "no" | "off"));
			prop_assert!(parse_flag(ENV_DISABLED, &value).is_err());
		}
	}
}
