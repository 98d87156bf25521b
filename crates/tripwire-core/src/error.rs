// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the core data model.

use thiserror::Error;

/// Errors raised while parsing or validating core types.
#[derive(Debug, Error)]
pub enum CoreError {
	#[error("invalid level: {0}")]
	InvalidLevel(String),

	#[error("invalid level code: {0}")]
	InvalidLevelCode(i32),

	#[error("invalid instruction address: {0}")]
	InvalidAddress(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
