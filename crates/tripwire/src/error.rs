// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the crash-reporting shim.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for shim operations.
pub type Result<T> = std::result::Result<T, ShimError>;

/// Errors that can occur in the shim.
#[derive(Debug, Error)]
pub enum ShimError {
	/// The runtime has been shut down.
	#[error("telemetry runtime has been shut down")]
	ClientShutdown,

	/// A platform fault handler could not be registered.
	#[error("failed to install fault handler for signal {signal}: {source}")]
	InstallFailed {
		/// Signal number being registered.
		signal: i32,
		#[source]
		source: std::io::Error,
	},

	/// Invalid environment configuration.
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),
}
