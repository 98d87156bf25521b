// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Panic hook integration for automatic crash reporting.

use std::panic::PanicHookInfo;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::FaultHandlerInstaller;
use crate::error::Result;
use crate::runtime::{TelemetryRuntime, SHUTDOWN_TIMEOUT};

// The runtime panics report to. Reinstalling replaces it, so a shut-down
// runtime is not kept alive by the hook.
static HOOK_RUNTIME: RwLock<Option<TelemetryRuntime>> = RwLock::new(None);

// The hook is registered once per process, chaining to whatever hook was
// registered before the first install.
static HOOK_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Reports panics, then runs the previously registered hook.
///
/// A panic may be caught or confined to one thread, so the runtime is only
/// flushed here, not shut down.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicHookInstaller;

impl FaultHandlerInstaller for PanicHookInstaller {
	fn name(&self) -> &'static str {
		"panic-hook"
	}

	fn install(&self, runtime: &TelemetryRuntime) -> Result<()> {
		*HOOK_RUNTIME.write().unwrap_or_else(PoisonError::into_inner) = Some(runtime.clone());

		if HOOK_REGISTERED.swap(true, Ordering::SeqCst) {
			debug!("Panic hook retargeted");
			return Ok(());
		}

		let previous = std::panic::take_hook();
		std::panic::set_hook(Box::new(move |info| {
			if let Some(runtime) = hook_runtime() {
				report_panic(&runtime, info);
			}
			previous(info);
		}));

		debug!("Panic hook installed");
		Ok(())
	}
}

fn hook_runtime() -> Option<TelemetryRuntime> {
	HOOK_RUNTIME
		.read()
		.unwrap_or_else(PoisonError::into_inner)
		.clone()
		.filter(|runtime| !runtime.is_closed())
}

fn report_panic(runtime: &TelemetryRuntime, info: &PanicHookInfo<'_>) {
	let message = extract_panic_message(info);
	let location = info
		.location()
		.map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));

	// Best effort: the previous hook still runs if this fails.
	if let Err(e) = runtime.report_panic(&message, location.as_deref()) {
		eprintln!("Failed to report panic to telemetry: {e}");
		return;
	}
	runtime.flush(SHUTDOWN_TIMEOUT);
}

fn extract_panic_message(info: &PanicHookInfo<'_>) -> String {
	if let Some(s) = info.payload().downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = info.payload().downcast_ref::<String>() {
		s.clone()
	} else {
		"Box<dyn Any>".to_string()
	}
}
