// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry events handed to a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level::Level;
use crate::stacktrace::{format_address, ThreadRecord};

/// An event ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
	Exception(ExceptionEvent),
	Message(MessageEvent),
}

impl TelemetryEvent {
	pub fn message(&self) -> &str {
		match self {
			Self::Exception(e) => &e.message,
			Self::Message(m) => &m.message,
		}
	}

	pub fn level(&self) -> Level {
		match self {
			Self::Exception(e) => e.level,
			Self::Message(m) => m.level,
		}
	}

	pub fn thread(&self) -> Option<&ThreadRecord> {
		match self {
			Self::Exception(e) => e.thread.as_ref(),
			Self::Message(m) => m.thread.as_ref(),
		}
	}

	pub fn timestamp(&self) -> DateTime<Utc> {
		match self {
			Self::Exception(e) => e.timestamp,
			Self::Message(m) => m.timestamp,
		}
	}
}

/// An unhandled fault or panic.
///
/// `code` and `address` are set for platform faults (exception code or signal
/// number, and the faulting address); panics carry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEvent {
	pub message: String,
	pub level: Level,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub code: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub address: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread: Option<ThreadRecord>,
	pub timestamp: DateTime<Utc>,
}

impl ExceptionEvent {
	/// A platform fault with its code and faulting address.
	pub fn fault(code: u32, address: usize, thread: Option<ThreadRecord>) -> Self {
		Self {
			message: Self::fault_message(code, address),
			level: Level::Fatal,
			code: Some(code),
			address: Some(address),
			thread,
			timestamp: Utc::now(),
		}
	}

	/// A Rust panic with its payload message and source location.
	pub fn panic(message: &str, location: Option<&str>, thread: Option<ThreadRecord>) -> Self {
		let message = match location {
			Some(location) => format!("panicked at {location}: {message}"),
			None => format!("panicked: {message}"),
		};
		Self {
			message,
			level: Level::Fatal,
			code: None,
			address: None,
			thread,
			timestamp: Utc::now(),
		}
	}

	/// `Exception <code hex> at <address hex>`.
	pub fn fault_message(code: u32, address: usize) -> String {
		format!("Exception {code:x} at {}", format_address(address))
	}
}

/// A leveled log message, optionally with the caller's stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
	pub level: Level,
	pub logger: String,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread: Option<ThreadRecord>,
	pub timestamp: DateTime<Utc>,
}

impl MessageEvent {
	pub fn new(
		level: Level,
		logger: impl Into<String>,
		message: impl Into<String>,
		thread: Option<ThreadRecord>,
	) -> Self {
		Self {
			level,
			logger: logger.into(),
			message: message.into(),
			thread,
			timestamp: Utc::now(),
		}
	}
}
