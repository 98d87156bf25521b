// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Process-wide fault interception.
//!
//! Each installer registers one kind of handler (panic hook, POSIX fault
//! signals, the Windows unhandled-exception filter) that reports through a
//! [`TelemetryRuntime`]. Installation is one-way: there is no uninstall.
//! Reinstalling retargets the handler to the new runtime. Whatever handler
//! was registered before the first install is kept and chained to after
//! reporting, so default handling still happens.

mod panic;
#[cfg(windows)]
mod seh;
#[cfg(unix)]
mod signal;

pub use panic::PanicHookInstaller;
#[cfg(windows)]
pub use seh::ExceptionFilterInstaller;
#[cfg(unix)]
pub use signal::{SignalInstaller, FAULT_SIGNALS};

use crate::error::Result;
use crate::runtime::TelemetryRuntime;

/// Registers a process-wide fault handler that reports via a runtime.
pub trait FaultHandlerInstaller: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	/// Replace the current handler with one reporting to `runtime`.
	fn install(&self, runtime: &TelemetryRuntime) -> Result<()>;
}

/// The installers that apply to the current platform.
pub fn platform_installers() -> Vec<Box<dyn FaultHandlerInstaller>> {
	let mut installers: Vec<Box<dyn FaultHandlerInstaller>> = vec![Box::new(PanicHookInstaller)];
	#[cfg(unix)]
	installers.push(Box::new(SignalInstaller::default()));
	#[cfg(windows)]
	installers.push(Box::new(ExceptionFilterInstaller));
	installers
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn panic_hook_is_always_installed() {
		let names: Vec<_> = platform_installers().iter().map(|i| i.name()).collect();
		assert_eq!(names[0], "panic-hook");
		#[cfg(unix)]
		assert!(names.contains(&"fault-signals"));
		#[cfg(windows)]
		assert!(names.contains(&"unhandled-exception-filter"));
	}
}
