// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Telemetry runtime: client lifecycle and event reporting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use tripwire_core::{
	EndpointConfig, ExceptionEvent, Level, MessageEvent, Stacktrace, TelemetryEvent, ThreadRecord,
};
use tripwire_version::BuildInfo;

use crate::client::{EventId, InitStatus, RecordingClient, TelemetryClient};
use crate::config::ShimConfig;
use crate::error::{Result, ShimError};
use crate::sentry_client::SentryClient;
use crate::sink::{LocalSink, StderrSink};
use crate::stack::{capture_stack_trace, BacktraceWalker, StackWalker};

/// How long shutdown and flush wait for queued events.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Frames skipped when capturing report stacks.
const FRAMES_TO_SKIP: usize = 0;

/// Builder for a [`TelemetryRuntime`].
pub struct RuntimeBuilder {
	is_developer_build: bool,
	release: Option<String>,
	dist: Option<String>,
	shim_config: ShimConfig,
	client: Option<Arc<dyn TelemetryClient>>,
	sink: Option<Arc<dyn LocalSink>>,
	walker: Option<Arc<dyn StackWalker>>,
}

impl RuntimeBuilder {
	/// Builder for the given build flavour, with no overrides.
	pub fn new(is_developer_build: bool) -> Self {
		Self {
			is_developer_build,
			release: None,
			dist: None,
			shim_config: ShimConfig::default(),
			client: None,
			sink: None,
			walker: None,
		}
	}

	/// Builder with overrides read from the process environment.
	pub fn from_env(is_developer_build: bool) -> Result<Self> {
		let config = ShimConfig::from_env()?;
		Ok(Self::new(is_developer_build).with_config(config))
	}

	/// Apply environment-style overrides.
	///
	/// A disabled config swaps in a [`RecordingClient`] unless a client was
	/// set explicitly.
	pub fn with_config(mut self, config: ShimConfig) -> Self {
		self.shim_config = config;
		self
	}

	/// Overrides the build's release tag.
	pub fn release(mut self, release: impl Into<String>) -> Self {
		self.release = Some(release.into());
		self
	}

	/// Overrides the build's distribution tag (git SHA by default).
	pub fn dist(mut self, dist: impl Into<String>) -> Self {
		self.dist = Some(dist.into());
		self
	}

	pub fn client(mut self, client: Arc<dyn TelemetryClient>) -> Self {
		self.client = Some(client);
		self
	}

	pub fn sink(mut self, sink: Arc<dyn LocalSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	pub fn walker(mut self, walker: Arc<dyn StackWalker>) -> Self {
		self.walker = Some(walker);
		self
	}

	/// Select the endpoint this builder would initialize the client with.
	pub fn endpoint(&self) -> EndpointConfig {
		let build = BuildInfo::current();
		let release = self
			.release
			.clone()
			.unwrap_or_else(|| build.release_tag.to_string());

		let mut endpoint = EndpointConfig::select(self.is_developer_build, release);
		if let Some(dist) = self.dist.clone().or_else(|| build.dist().map(str::to_string)) {
			endpoint = endpoint.with_dist(dist);
		}
		self.shim_config.apply(endpoint)
	}

	/// Start the telemetry client and return the runtime.
	///
	/// A failed client start is logged and kept as [`TelemetryRuntime::init_status`];
	/// the runtime is still usable and simply delivers nothing.
	pub fn init(self) -> TelemetryRuntime {
		let endpoint = self.endpoint();

		let client = match self.client {
			Some(client) => client,
			None if self.shim_config.disabled => {
				info!("Telemetry disabled, events are kept in memory");
				Arc::new(RecordingClient::new())
			}
			None => Arc::new(SentryClient::new()),
		};

		let init_status = client.init(&endpoint);
		if init_status.is_ok() {
			info!(
				release = %endpoint.release,
				developer_build = self.is_developer_build,
				"Telemetry client initialized"
			);
		} else {
			warn!(
				status = init_status.code(),
				release = %endpoint.release,
				"Telemetry client failed to initialize, continuing without delivery"
			);
		}

		let inner = Arc::new(RuntimeInner {
			endpoint,
			client,
			sink: self.sink.unwrap_or_else(|| Arc::new(StderrSink)),
			walker: self.walker.unwrap_or_else(|| Arc::new(BacktraceWalker)),
			init_status,
			closed: AtomicBool::new(false),
		});

		TelemetryRuntime { inner }
	}
}

struct RuntimeInner {
	endpoint: EndpointConfig,
	client: Arc<dyn TelemetryClient>,
	sink: Arc<dyn LocalSink>,
	walker: Arc<dyn StackWalker>,
	init_status: InitStatus,
	closed: AtomicBool,
}

/// An initialized telemetry client plus the collaborators used to report.
///
/// Cheap to clone; all clones share one lifecycle. Created by [`init`] or
/// [`TelemetryRuntime::builder`], ended by [`TelemetryRuntime::shutdown`].
///
/// [`init`]: crate::init
#[derive(Clone)]
pub struct TelemetryRuntime {
	inner: Arc<RuntimeInner>,
}

impl TelemetryRuntime {
	pub fn builder(is_developer_build: bool) -> RuntimeBuilder {
		RuntimeBuilder::new(is_developer_build)
	}

	/// The client's own init status code.
	pub fn init_status(&self) -> InitStatus {
		self.inner.init_status
	}

	pub fn endpoint(&self) -> &EndpointConfig {
		&self.inner.endpoint
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Capture the current thread's stack with this runtime's walker.
	pub fn capture_stack_trace(&self, top_address: Option<usize>, frames_to_skip: usize) -> Stacktrace {
		capture_stack_trace(self.inner.walker.as_ref(), top_address, frames_to_skip)
	}

	/// Report an unhandled platform fault.
	///
	/// The formatted message is always written once to the local sink, before
	/// and independently of delivery.
	pub fn report_exception(&self, code: u32, address: usize) -> Result<EventId> {
		self.inner.sink.report(&ExceptionEvent::fault_message(code, address));
		self.check_closed()?;

		let stacktrace = self.capture_stack_trace(Some(address), FRAMES_TO_SKIP);
		let event = ExceptionEvent::fault(code, address, ThreadRecord::wrap(stacktrace));

		Ok(self.submit(TelemetryEvent::Exception(event)))
	}

	/// Report a panic with its payload message and source location.
	pub fn report_panic(&self, message: &str, location: Option<&str>) -> Result<EventId> {
		self.check_closed()?;

		let stacktrace = self.capture_stack_trace(None, FRAMES_TO_SKIP);
		let event = ExceptionEvent::panic(message, location, ThreadRecord::wrap(stacktrace));

		Ok(self.submit(TelemetryEvent::Exception(event)))
	}

	/// Report a leveled message, optionally with the caller's stack.
	pub fn report_message(
		&self,
		level: Level,
		logger: &str,
		message: &str,
		include_stack: bool,
	) -> Result<EventId> {
		self.check_closed()?;

		let thread = if include_stack {
			ThreadRecord::wrap(self.capture_stack_trace(None, FRAMES_TO_SKIP))
		} else {
			None
		};
		let event = MessageEvent::new(level, logger, message, thread);

		Ok(self.submit(TelemetryEvent::Message(event)))
	}

	/// Wait for queued events without stopping the client.
	pub fn flush(&self, timeout: Duration) -> bool {
		if self.is_closed() {
			return false;
		}
		self.inner.client.flush(timeout)
	}

	/// Flush and stop the client. Later calls do nothing.
	pub fn shutdown(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		self.inner.client.shutdown(SHUTDOWN_TIMEOUT);
		info!("Telemetry client shutdown");
	}

	fn check_closed(&self) -> Result<()> {
		if self.is_closed() {
			return Err(ShimError::ClientShutdown);
		}
		Ok(())
	}

	fn submit(&self, event: TelemetryEvent) -> EventId {
		let has_stack = event.thread().is_some();
		let level = event.level();
		let event_id = self.inner.client.capture(event);
		debug!(event_id = %event_id, %level, has_stack, "Telemetry event submitted");
		event_id
	}
}
