// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Entry-point wrappers.
//!
//! ```ignore
//! fn main() {
//!     let code = tripwire::run_wrapped(false, std::env::args().collect(), app_main);
//!     std::process::exit(code);
//! }
//!
//! fn app_main(args: &[String]) -> i32 {
//!     // ...
//!     0
//! }
//! ```

use std::ffi::OsString;

use tracing::{debug, warn};

use crate::fault::{platform_installers, FaultHandlerInstaller};
use crate::runtime::RuntimeBuilder;

/// Run `body` with crash reporting around it, for UTF-8 arguments.
pub fn run_wrapped<F>(is_developer_build: bool, args: Vec<String>, body: F) -> i32
where
	F: FnOnce(&[String]) -> i32,
{
	run_wrapped_with(builder_from_env(is_developer_build), &platform_installers(), args, body)
}

/// Run `body` with crash reporting around it, for platform-native arguments.
pub fn run_wrapped_os<F>(is_developer_build: bool, args: Vec<OsString>, body: F) -> i32
where
	F: FnOnce(&[OsString]) -> i32,
{
	run_wrapped_with(builder_from_env(is_developer_build), &platform_installers(), args, body)
}

/// Initialize from `builder`, install `installers`, run `body`, shut down.
///
/// Neither a failed client start nor a failed install stops `body` from
/// running. Shutdown happens once, after `body` returns normally; on a fault
/// the installed filter shuts down instead.
pub fn run_wrapped_with<A, F>(
	builder: RuntimeBuilder,
	installers: &[Box<dyn FaultHandlerInstaller>],
	args: Vec<A>,
	body: F,
) -> i32
where
	F: FnOnce(&[A]) -> i32,
{
	let runtime = builder.init();

	for installer in installers {
		match installer.install(&runtime) {
			Ok(()) => debug!(installer = installer.name(), "Fault handler installed"),
			Err(e) => warn!(installer = installer.name(), error = %e, "Failed to install fault handler"),
		}
	}

	let code = body(&args);

	runtime.shutdown();
	code
}

pub(crate) fn builder_from_env(is_developer_build: bool) -> RuntimeBuilder {
	match RuntimeBuilder::from_env(is_developer_build) {
		Ok(builder) => builder,
		Err(e) => {
			warn!(error = %e, "Ignoring invalid telemetry configuration");
			RuntimeBuilder::new(is_developer_build)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use crate::client::RecordingClient;
	use crate::error::{Result, ShimError};
	use crate::runtime::TelemetryRuntime;
	use crate::sink::BufferSink;

	struct FailingInstaller;

	impl FaultHandlerInstaller for FailingInstaller {
		fn name(&self) -> &'static str {
			"failing"
		}

		fn install(&self, _runtime: &TelemetryRuntime) -> Result<()> {
			Err(ShimError::InstallFailed {
				signal: 0,
				source: std::io::Error::other("denied"),
			})
		}
	}

	fn recording_builder(client: &Arc<RecordingClient>) -> RuntimeBuilder {
		RuntimeBuilder::new(false)
			.client(client.clone())
			.sink(Arc::new(BufferSink::new()))
	}

	#[test]
	fn returns_body_exit_code_after_single_shutdown() {
		let client = Arc::new(RecordingClient::new());

		let code = run_wrapped_with(recording_builder(&client), &[], vec!["app".to_string()], |args| {
			assert_eq!(args, ["app".to_string()]);
			assert_eq!(client.shutdown_calls(), 0);
			42
		});

		assert_eq!(code, 42);
		assert_eq!(client.init_calls(), 1);
		assert_eq!(client.shutdown_calls(), 1);
	}

	#[test]
	fn wide_arguments_are_forwarded() {
		let client = Arc::new(RecordingClient::new());
		let args = vec![OsString::from("app"), OsString::from("--flag")];

		let code = run_wrapped_with(recording_builder(&client), &[], args, |args| args.len() as i32);

		assert_eq!(code, 2);
		assert_eq!(client.shutdown_calls(), 1);
	}

	#[test]
	fn install_failure_does_not_stop_body() {
		let client = Arc::new(RecordingClient::new());
		let installers: Vec<Box<dyn FaultHandlerInstaller>> = vec![Box::new(FailingInstaller)];

		let code = run_wrapped_with(recording_builder(&client), &installers, Vec::<String>::new(), |_| 3);

		assert_eq!(code, 3);
		assert_eq!(client.shutdown_calls(), 1);
	}
}
