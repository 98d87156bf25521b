// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Windows unhandled-exception filter.

use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use tracing::debug;
use windows::Win32::System::Diagnostics::Debug::{
	SetUnhandledExceptionFilter, EXCEPTION_POINTERS, LPTOP_LEVEL_EXCEPTION_FILTER,
};

use super::FaultHandlerInstaller;
use crate::error::Result;
use crate::runtime::TelemetryRuntime;

/// Tells the system the exception was handled; the process then terminates.
const EXCEPTION_EXECUTE_HANDLER: i32 = 1;

struct FilterState {
	runtime: TelemetryRuntime,
	previous: LPTOP_LEVEL_EXCEPTION_FILTER,
}

// Leaked on replacement, like the unix signal state.
static FILTER_STATE: AtomicPtr<FilterState> = AtomicPtr::new(ptr::null_mut());
static IN_FAULT: AtomicBool = AtomicBool::new(false);

/// Installs the process-wide unhandled-exception filter.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionFilterInstaller;

impl FaultHandlerInstaller for ExceptionFilterInstaller {
	fn name(&self) -> &'static str {
		"unhandled-exception-filter"
	}

	fn install(&self, runtime: &TelemetryRuntime) -> Result<()> {
		// SAFETY: the filter only reads leaked, immutable state.
		let mut previous = unsafe { SetUnhandledExceptionFilter(Some(handle_exception)) };

		if is_ours(previous) {
			previous = current_state().and_then(|state| state.previous);
		}

		let state = Box::into_raw(Box::new(FilterState {
			runtime: runtime.clone(),
			previous,
		}));
		FILTER_STATE.store(state, Ordering::Release);
		IN_FAULT.store(false, Ordering::SeqCst);

		debug!(chained = previous.is_some(), "Unhandled exception filter installed");
		Ok(())
	}
}

fn is_ours(filter: LPTOP_LEVEL_EXCEPTION_FILTER) -> bool {
	filter.map(|f| f as usize) == Some(handle_exception as usize)
}

fn current_state() -> Option<&'static FilterState> {
	// SAFETY: non-null pointers come from Box::into_raw and are never freed.
	unsafe { FILTER_STATE.load(Ordering::Acquire).as_ref() }
}

unsafe extern "system" fn handle_exception(info: *const EXCEPTION_POINTERS) -> i32 {
	let state = current_state();

	if !IN_FAULT.swap(true, Ordering::SeqCst) {
		if let Some(state) = state {
			// SAFETY: the system passes valid exception pointers to the filter.
			let record = unsafe { info.as_ref().and_then(|info| info.ExceptionRecord.as_ref()) };
			let (code, address) = record
				.map(|r| (r.ExceptionCode.0 as u32, r.ExceptionAddress as usize))
				.unwrap_or((0, 0));

			let _ = state.runtime.report_exception(code, address);
			state.runtime.shutdown();
		}
	}

	match state.and_then(|state| state.previous) {
		// SAFETY: `previous` was the registered top-level filter.
		Some(previous) => unsafe { previous(info) },
		None => EXCEPTION_EXECUTE_HANDLER,
	}
}
