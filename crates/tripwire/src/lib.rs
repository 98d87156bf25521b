// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Crash-reporting shim for native applications.
//!
//! Selects a Sentry endpoint for the build flavour, installs process-wide
//! fault handlers and reports faults, panics and leveled messages with the
//! raw instruction addresses of the current stack. Symbolication happens
//! server side.
//!
//! # Quick Start
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!     let code = tripwire::run_wrapped(false, std::env::args().collect(), app_main);
//!     std::process::exit(code);
//! }
//!
//! fn app_main(_args: &[String]) -> i32 {
//!     0
//! }
//! ```
//!
//! Or drive the lifecycle by hand:
//!
//! ```ignore
//! use tripwire::{FaultHandlerInstaller, Level, PanicHookInstaller};
//!
//! let runtime = tripwire::init(false);
//! PanicHookInstaller.install(&runtime)?;
//!
//! runtime.report_message(Level::Warning, "updater", "Manifest signature expired", true)?;
//!
//! runtime.shutdown();
//! ```
//!
//! # Configuration
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `TRIPWIRE_DSN` | Replace the built-in DSN |
//! | `TRIPWIRE_ENVIRONMENT` | Environment tag on every event |
//! | `TRIPWIRE_DEBUG` | Client debug logging |
//! | `TRIPWIRE_DISABLED` | Keep events in memory, send nothing |
//!
//! `TRIPWIRE_TIER` is read at build time and becomes the release suffix.

mod client;
mod config;
mod error;
pub mod fault;
mod runtime;
mod sentry_client;
mod sink;
mod stack;
mod wrap;

pub use client::{EventId, InitStatus, RecordingClient, TelemetryClient};
pub use config::{ConfigError, ShimConfig, ENV_DEBUG, ENV_DISABLED, ENV_DSN, ENV_ENVIRONMENT};
pub use error::{Result, ShimError};
pub use fault::{platform_installers, FaultHandlerInstaller, PanicHookInstaller};
#[cfg(windows)]
pub use fault::ExceptionFilterInstaller;
#[cfg(unix)]
pub use fault::{SignalInstaller, FAULT_SIGNALS};
pub use runtime::{RuntimeBuilder, TelemetryRuntime, SHUTDOWN_TIMEOUT};
pub use sentry_client::SentryClient;
pub use sink::{BufferSink, LocalSink, StderrSink};
pub use stack::{capture_stack_trace, BacktraceWalker, StackWalker};
pub use wrap::{run_wrapped, run_wrapped_os, run_wrapped_with};

pub use tripwire_core::{
	EndpointConfig, ExceptionEvent, Frame, Level, MessageEvent, Stacktrace, TelemetryEvent, ThreadRecord,
	DSN_DESKTOP, DSN_DEVELOPER, MAX_FRAMES,
};
pub use tripwire_version::BuildInfo;

/// Start the telemetry client for this build flavour.
///
/// Environment overrides apply; an invalid override is logged and ignored.
/// A client that fails to start still yields a usable runtime, see
/// [`TelemetryRuntime::init_status`].
pub fn init(is_developer_build: bool) -> TelemetryRuntime {
	wrap::builder_from_env(is_developer_build).init()
}
