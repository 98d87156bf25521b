// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The telemetry client seam.
//!
//! Delivery, batching, retry and on-disk persistence all live behind this trait.
//! The shim only configures a client, hands it finished events, and stops it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tripwire_core::{EndpointConfig, TelemetryEvent};
use uuid::Uuid;

/// Identifier returned for a submitted event.
pub type EventId = Uuid;

/// Status code returned by a client's `init`.
///
/// Zero is success; any other value is client-defined and only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InitStatus(i32);

impl InitStatus {
	pub const OK: Self = Self(0);
	/// The DSN could not be parsed.
	pub const INVALID_DSN: Self = Self(1);
	/// The client started but will not send anything.
	pub const DISABLED: Self = Self(2);

	pub const fn from_code(code: i32) -> Self {
		Self(code)
	}

	pub const fn code(self) -> i32 {
		self.0
	}

	pub const fn is_ok(self) -> bool {
		self.0 == 0
	}
}

/// An opaque, synchronous telemetry collector.
pub trait TelemetryClient: Send + Sync {
	/// Start the client for `config`.
	fn init(&self, config: &EndpointConfig) -> InitStatus;

	/// Queue an event for delivery.
	fn capture(&self, event: TelemetryEvent) -> EventId;

	/// Wait up to `timeout` for queued events to be sent.
	fn flush(&self, timeout: Duration) -> bool;

	/// Flush and stop the client.
	fn shutdown(&self, timeout: Duration);
}

#[derive(Debug, Default)]
struct Recorded {
	config: Option<EndpointConfig>,
	events: Vec<TelemetryEvent>,
	init_calls: usize,
	flush_calls: usize,
	shutdown_calls: usize,
}

/// Client that keeps everything in memory.
///
/// Used for dry runs (`TRIPWIRE_DISABLED=1`) and to observe what the shim
/// submits.
#[derive(Debug)]
pub struct RecordingClient {
	init_status: InitStatus,
	recorded: Mutex<Recorded>,
}

impl RecordingClient {
	pub fn new() -> Self {
		Self::with_init_status(InitStatus::OK)
	}

	/// A client whose `init` reports `status`.
	pub fn with_init_status(status: InitStatus) -> Self {
		Self {
			init_status: status,
			recorded: Mutex::new(Recorded::default()),
		}
	}

	fn recorded(&self) -> MutexGuard<'_, Recorded> {
		self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// The configuration passed to the last `init`.
	pub fn config(&self) -> Option<EndpointConfig> {
		self.recorded().config.clone()
	}

	pub fn events(&self) -> Vec<TelemetryEvent> {
		self.recorded().events.clone()
	}

	pub fn init_calls(&self) -> usize {
		self.recorded().init_calls
	}

	pub fn flush_calls(&self) -> usize {
		self.recorded().flush_calls
	}

	pub fn shutdown_calls(&self) -> usize {
		self.recorded().shutdown_calls
	}
}

impl Default for RecordingClient {
	fn default() -> Self {
		Self::new()
	}
}

impl TelemetryClient for RecordingClient {
	fn init(&self, config: &EndpointConfig) -> InitStatus {
		let mut recorded = self.recorded();
		recorded.config = Some(config.clone());
		recorded.init_calls += 1;
		self.init_status
	}

	fn capture(&self, event: TelemetryEvent) -> EventId {
		self.recorded().events.push(event);
		Uuid::now_v7()
	}

	fn flush(&self, _timeout: Duration) -> bool {
		self.recorded().flush_calls += 1;
		true
	}

	fn shutdown(&self, _timeout: Duration) {
		self.recorded().shutdown_calls += 1;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tripwire_core::{Level, MessageEvent};

	#[test]
	fn init_status_zero_is_ok() {
		assert!(InitStatus::OK.is_ok());
		assert!(!InitStatus::INVALID_DSN.is_ok());
		assert_eq!(InitStatus::from_code(-3).code(), -3);
	}

	#[test]
	fn recording_client_tracks_calls() {
		let client = RecordingClient::with_init_status(InitStatus::DISABLED);
		let status = client.init(&EndpointConfig::select(false, "1.0.0"));
		client.capture(TelemetryEvent::Message(MessageEvent::new(
			Level::Info,
			"app",
			"hello",
			None,
		)));
		client.flush(Duration::from_millis(1));
		client.shutdown(Duration::from_millis(1));

		assert_eq!(status, InitStatus::DISABLED);
		assert_eq!(client.init_calls(), 1);
		assert_eq!(client.events().len(), 1);
		assert_eq!(client.flush_calls(), 1);
		assert_eq!(client.shutdown_calls(), 1);
		assert_eq!(client.config().unwrap().release, "1.0.0");
	}
}
