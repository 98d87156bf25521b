// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Collector endpoint selection.

use serde::{Deserialize, Serialize};

/// Collector DSN for end-user (desktop) builds.
pub const DSN_DESKTOP: &str = "https://92eb58e6005d47daa33c9c9e39458eb7@sentry.tripwire.dev/5";

/// Collector DSN for developer builds.
pub const DSN_DEVELOPER: &str = "https://39b25a09410349a58fe12aaf721565af@sentry.tripwire.dev/6";

/// Endpoint and release identity for a telemetry client.
///
/// Chosen once when the runtime is built and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
	pub dsn: String,
	pub release: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub environment: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dist: Option<String>,
	#[serde(default)]
	pub debug: bool,
}

impl EndpointConfig {
	/// The compiled-in DSN for a build flavour.
	pub const fn dsn_for(is_developer_build: bool) -> &'static str {
		if is_developer_build {
			DSN_DEVELOPER
		} else {
			DSN_DESKTOP
		}
	}

	/// Select the endpoint for a build flavour and tag it with `release`.
	pub fn select(is_developer_build: bool, release: impl Into<String>) -> Self {
		Self {
			dsn: Self::dsn_for(is_developer_build).to_string(),
			release: release.into(),
			environment: None,
			dist: None,
			debug: false,
		}
	}

	pub fn with_dsn(mut self, dsn: impl Into<String>) -> Self {
		self.dsn = dsn.into();
		self
	}

	pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
		self.environment = Some(environment.into());
		self
	}

	pub fn with_dist(mut self, dist: impl Into<String>) -> Self {
		self.dist = Some(dist.into());
		self
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}
}
