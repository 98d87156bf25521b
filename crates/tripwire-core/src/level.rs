// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Event severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Severity of a reported event.
///
/// The numeric codes match the native Sentry SDK's `sentry_level_t`, so callers
/// that only carry an integer level across an FFI or config boundary can use
/// [`Level::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Debug,
	#[default]
	Info,
	Warning,
	Error,
	Fatal,
}

impl Level {
	/// Native SDK numeric code for this level.
	pub const fn code(self) -> i32 {
		match self {
			Self::Debug => -1,
			Self::Info => 0,
			Self::Warning => 1,
			Self::Error => 2,
			Self::Fatal => 3,
		}
	}

	/// Level for a native SDK numeric code.
	pub fn from_code(code: i32) -> Result<Self, CoreError> {
		match code {
			-1 => Ok(Self::Debug),
			0 => Ok(Self::Info),
			1 => Ok(Self::Warning),
			2 => Ok(Self::Error),
			3 => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidLevelCode(code)),
		}
	}
}

impl fmt::Display for Level {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Debug => write!(f, "debug"),
			Self::Info => write!(f, "info"),
			Self::Warning => write!(f, "warning"),
			Self::Error => write!(f, "error"),
			Self::Fatal => write!(f, "fatal"),
		}
	}
}

impl FromStr for Level {
	type Err = CoreError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"debug" => Ok(Self::Debug),
			"info" => Ok(Self::Info),
			"warning" => Ok(Self::Warning),
			"error" => Ok(Self::Error),
			"fatal" => Ok(Self::Fatal),
			_ => Err(CoreError::InvalidLevel(s.to_string())),
		}
	}
}
