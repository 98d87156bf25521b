// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sentry-backed telemetry client.
//!
//! Exception events are deliberately sent message-shaped: the native
//! `exception` interface renders corrupted in the collector UI when combined
//! with a raw-address thread stack, so the fault code and address travel in the
//! message and as tags instead. Revisit only against a collector verified not
//! to have that defect.

use std::sync::{Arc, Mutex, PoisonError, TryLockError};
use std::time::Duration;

use sentry::protocol::{self, Addr, Event, Thread};
use tracing::{debug, warn};
use tripwire_core::{format_address, EndpointConfig, Level, Stacktrace, TelemetryEvent};

use crate::client::{EventId, InitStatus, TelemetryClient};

/// Native-platform events so the collector symbolicates raw addresses.
const PLATFORM: &str = "native";

/// [`TelemetryClient`] over the process-wide Sentry hub.
#[derive(Default)]
pub struct SentryClient {
	guard: Mutex<Option<sentry::ClientInitGuard>>,
}

impl SentryClient {
	pub fn new() -> Self {
		Self::default()
	}
}

impl TelemetryClient for SentryClient {
	fn init(&self, config: &EndpointConfig) -> InitStatus {
		let dsn: sentry::types::Dsn = match config.dsn.parse() {
			Ok(dsn) => dsn,
			Err(e) => {
				warn!(error = %e, "Invalid collector DSN, telemetry disabled");
				return InitStatus::INVALID_DSN;
			}
		};

		let dist = config.dist.clone();
		let options = sentry::ClientOptions {
			dsn: Some(dsn),
			release: Some(config.release.clone().into()),
			environment: config.environment.clone().map(Into::into),
			debug: config.debug,
			// The shim installs its own fault handlers.
			default_integrations: false,
			before_send: Some(Arc::new(move |mut event: Event<'static>| {
				if event.dist.is_none() {
					event.dist = dist.clone().map(Into::into);
				}
				Some(event)
			})),
			..Default::default()
		};

		let guard = sentry::init(options);
		let status = if guard.is_enabled() {
			InitStatus::OK
		} else {
			InitStatus::DISABLED
		};

		*self.guard.lock().unwrap_or_else(PoisonError::into_inner) = Some(guard);
		debug!(status = status.code(), "Sentry client initialized");
		status
	}

	fn capture(&self, event: TelemetryEvent) -> EventId {
		sentry::capture_event(to_sentry_event(&event))
	}

	fn flush(&self, timeout: Duration) -> bool {
		sentry::Hub::current()
			.client()
			.map(|client| client.flush(Some(timeout)))
			.unwrap_or(false)
	}

	fn shutdown(&self, timeout: Duration) {
		// A fault may arrive while init holds the lock; never block on it here.
		let guard = match self.guard.try_lock() {
			Ok(mut slot) => slot.take(),
			Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().take(),
			Err(TryLockError::WouldBlock) => {
				// The holder is mid-init on this client, so the bound client is ours.
				if let Some(client) = sentry::Hub::current().client() {
					client.close(Some(timeout));
				}
				return;
			}
		};

		// No guard means this client never started; the hub's client belongs
		// to someone else.
		if let Some(guard) = guard {
			guard.close(Some(timeout));
		}
	}
}

fn to_sentry_level(level: Level) -> protocol::Level {
	match level {
		Level::Debug => protocol::Level::Debug,
		Level::Info => protocol::Level::Info,
		Level::Warning => protocol::Level::Warning,
		Level::Error => protocol::Level::Error,
		Level::Fatal => protocol::Level::Fatal,
	}
}

fn to_sentry_stacktrace(stacktrace: &Stacktrace) -> protocol::Stacktrace {
	protocol::Stacktrace {
		frames: stacktrace
			.frames
			.iter()
			.map(|frame| protocol::Frame {
				instruction_addr: Some(Addr(frame.instruction_addr as u64)),
				..Default::default()
			})
			.collect(),
		..Default::default()
	}
}

/// Convert an event to its Sentry wire shape.
fn to_sentry_event(event: &TelemetryEvent) -> Event<'static> {
	let mut out = Event {
		message: Some(event.message().to_string()),
		level: to_sentry_level(event.level()),
		platform: PLATFORM.into(),
		timestamp: event.timestamp().into(),
		..Default::default()
	};

	match event {
		TelemetryEvent::Exception(exception) => {
			if let Some(code) = exception.code {
				out.tags.insert("fault.code".to_string(), format!("{code:#x}"));
			}
			if let Some(address) = exception.address {
				out.tags
					.insert("fault.address".to_string(), format_address(address));
			}
		}
		TelemetryEvent::Message(message) => {
			out.logger = Some(message.logger.clone());
		}
	}

	if let Some(thread) = event.thread() {
		out.threads = vec![Thread {
			stacktrace: Some(to_sentry_stacktrace(&thread.stacktrace)),
			..Default::default()
		}]
		.into();
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use tripwire_core::{ExceptionEvent, MessageEvent, ThreadRecord, DSN_DESKTOP};

	#[test]
	fn exception_is_sent_message_shaped() {
		let thread = ThreadRecord::wrap(Stacktrace::from_walk(&[0x30, 0x20, 0x10], Some(0x0040_1000)));
		let event = TelemetryEvent::Exception(ExceptionEvent::fault(0xC000_0005, 0x0040_1000, thread));

		let out = to_sentry_event(&event);

		assert!(out.exception.values.is_empty());
		assert_eq!(out.message.as_deref(), Some(event.message()));
		assert_eq!(out.level, protocol::Level::Fatal);
		assert_eq!(out.tags.get("fault.code").map(String::as_str), Some("0xc0000005"));
		assert_eq!(out.threads.values.len(), 1);

		let frames = &out.threads.values[0].stacktrace.as_ref().unwrap().frames;
		assert_eq!(frames.len(), 4);
		assert_eq!(frames[3].instruction_addr, Some(Addr(0x0040_1000)));
	}

	#[test]
	fn message_without_stack_has_no_threads() {
		let event = TelemetryEvent::Message(MessageEvent::new(Level::Info, "app", "started", None));

		let out = to_sentry_event(&event);

		assert!(out.threads.values.is_empty());
		assert_eq!(out.logger.as_deref(), Some("app"));
		assert_eq!(out.level, protocol::Level::Info);
	}

	struct NullTransport;

	impl sentry::Transport for NullTransport {
		fn send_envelope(&self, _envelope: sentry::Envelope) {}
	}

	#[test]
	fn shutdown_without_guard_leaves_bound_client_running() {
		let options = sentry::ClientOptions {
			dsn: Some(DSN_DESKTOP.parse().unwrap()),
			transport: Some(Arc::new(Arc::new(NullTransport))),
			..Default::default()
		};
		let bound = Arc::new(sentry::Client::from(options));
		let hub = Arc::new(sentry::Hub::new(Some(bound.clone()), Arc::new(sentry::Scope::default())));
		assert!(bound.is_enabled());

		sentry::Hub::run(hub, || {
			let client = SentryClient::new();
			let status = client.init(&EndpointConfig::select(false, "1.0.0").with_dsn(""));
			assert_eq!(status, InitStatus::INVALID_DSN);
			client.shutdown(Duration::from_millis(10));
		});

		assert!(bound.is_enabled());
	}

	#[test]
	fn invalid_dsn_reports_status_without_starting() {
		let client = SentryClient::new();
		let status = client.init(&EndpointConfig::select(false, "1.0.0").with_dsn("not a dsn"));
		assert_eq!(status, InitStatus::INVALID_DSN);
		client.shutdown(Duration::from_millis(10));
	}
}
