// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! POSIX fault-signal filter.
//!
//! On a fault the filter reports the signal number and faulting address,
//! shuts the runtime down so the buffered event is flushed, restores the
//! previous disposition and re-raises. The restored disposition (by default
//! terminate with a core dump) runs as soon as the filter returns; nothing is
//! recovered or resumed.

use std::ffi::c_void;
use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};

use libc::c_int;
use tracing::debug;

use super::FaultHandlerInstaller;
use crate::error::{Result, ShimError};
use crate::runtime::TelemetryRuntime;

/// Signals that indicate the process faulted.
pub const FAULT_SIGNALS: [c_int; 5] = [
	libc::SIGSEGV,
	libc::SIGBUS,
	libc::SIGILL,
	libc::SIGFPE,
	libc::SIGABRT,
];

type SigactionFn = extern "C" fn(c_int, *mut libc::siginfo_t, *mut c_void);

/// What the filter needs when a signal arrives.
struct HandlerState {
	runtime: TelemetryRuntime,
	previous: Vec<(c_int, libc::sigaction)>,
}

impl HandlerState {
	fn previous_for(&self, signal: c_int) -> Option<&libc::sigaction> {
		self.previous
			.iter()
			.find(|(s, _)| *s == signal)
			.map(|(_, action)| action)
	}
}

// Published states are leaked, never freed: a filter on another thread may
// still be reading the one being replaced.
static HANDLER_STATE: AtomicPtr<HandlerState> = AtomicPtr::new(ptr::null_mut());

// Set by the first fault; a nested fault skips reporting. Cleared on install.
static IN_FAULT: AtomicBool = AtomicBool::new(false);

/// Installs the fault filter for a set of signals.
#[derive(Debug, Clone)]
pub struct SignalInstaller {
	signals: Vec<c_int>,
}

impl SignalInstaller {
	pub fn with_signals(signals: impl Into<Vec<c_int>>) -> Self {
		Self {
			signals: signals.into(),
		}
	}

	pub fn signals(&self) -> &[c_int] {
		&self.signals
	}
}

impl Default for SignalInstaller {
	fn default() -> Self {
		Self::with_signals(FAULT_SIGNALS)
	}
}

impl FaultHandlerInstaller for SignalInstaller {
	fn name(&self) -> &'static str {
		"fault-signals"
	}

	fn install(&self, runtime: &TelemetryRuntime) -> Result<()> {
		let current = current_state();

		let mut previous = Vec::with_capacity(self.signals.len());
		for &signal in &self.signals {
			let mut old = empty_action();
			// SAFETY: a null `act` only queries the current disposition.
			if unsafe { libc::sigaction(signal, ptr::null(), &mut old) } != 0 {
				return Err(install_failed(signal));
			}

			previous.push((signal, chain_target(old, signal, current)));
		}

		let state = Box::into_raw(Box::new(HandlerState {
			runtime: runtime.clone(),
			previous,
		}));
		HANDLER_STATE.store(state, Ordering::Release);
		IN_FAULT.store(false, Ordering::SeqCst);

		for &signal in &self.signals {
			let mut action = empty_action();
			action.sa_sigaction = filter_address();
			action.sa_flags = libc::SA_SIGINFO | libc::SA_ONSTACK;
			// SAFETY: `action` is a valid, exclusively borrowed sigaction.
			unsafe { libc::sigemptyset(&mut action.sa_mask) };

			// SAFETY: `action` is fully initialized and the filter only reads
			// leaked, immutable state.
			if unsafe { libc::sigaction(signal, &action, ptr::null_mut()) } != 0 {
				return Err(install_failed(signal));
			}
		}

		debug!(signals = ?self.signals, "Fault signal filter installed");
		Ok(())
	}
}

fn install_failed(signal: c_int) -> ShimError {
	ShimError::InstallFailed {
		signal,
		source: io::Error::last_os_error(),
	}
}

/// The disposition to chain to, given the one found at install time.
///
/// Reinstalling must chain to what was replaced the first time, not to the
/// filter itself.
fn chain_target(old: libc::sigaction, signal: c_int, current: Option<&HandlerState>) -> libc::sigaction {
	if old.sa_sigaction != filter_address() {
		return old;
	}
	current
		.and_then(|state| state.previous_for(signal))
		.copied()
		.unwrap_or_else(default_action)
}

fn current_state() -> Option<&'static HandlerState> {
	// SAFETY: non-null pointers in HANDLER_STATE come from Box::into_raw and
	// are never freed.
	unsafe { HANDLER_STATE.load(Ordering::Acquire).as_ref() }
}

fn filter_address() -> libc::sighandler_t {
	handle_fault as SigactionFn as libc::sighandler_t
}

fn empty_action() -> libc::sigaction {
	// SAFETY: sigaction is a plain C struct for which all-zero is valid.
	unsafe { mem::zeroed() }
}

fn default_action() -> libc::sigaction {
	let mut action = empty_action();
	action.sa_sigaction = libc::SIG_DFL;
	action
}

/// The faulting instruction: the interrupted program counter when the
/// platform exposes it, otherwise `si_addr`.
fn fault_address(info: *mut libc::siginfo_t, context: *mut c_void) -> usize {
	match program_counter(context) {
		Some(pc) if pc != 0 => pc,
		_ => data_address(info),
	}
}

/// `si_addr` is the accessed memory address for SIGSEGV and SIGBUS, so it is
/// only a fallback.
fn data_address(info: *mut libc::siginfo_t) -> usize {
	if info.is_null() {
		return 0;
	}

	#[cfg(any(target_os = "linux", target_os = "android"))]
	// SAFETY: the kernel passes a valid siginfo_t for SA_SIGINFO handlers.
	let address = unsafe { (*info).si_addr() };
	#[cfg(not(any(target_os = "linux", target_os = "android")))]
	// SAFETY: the kernel passes a valid siginfo_t for SA_SIGINFO handlers.
	let address = unsafe { (*info).si_addr };

	address as usize
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
fn program_counter(context: *mut c_void) -> Option<usize> {
	// SAFETY: for SA_SIGINFO handlers the third argument is a ucontext_t.
	let uc = unsafe { (context as *const libc::ucontext_t).as_ref()? };
	Some(uc.uc_mcontext.gregs[libc::REG_RIP as usize] as usize)
}

#[cfg(all(target_os = "linux", target_arch = "x86"))]
fn program_counter(context: *mut c_void) -> Option<usize> {
	// SAFETY: for SA_SIGINFO handlers the third argument is a ucontext_t.
	let uc = unsafe { (context as *const libc::ucontext_t).as_ref()? };
	Some(uc.uc_mcontext.gregs[libc::REG_EIP as usize] as usize)
}

#[cfg(all(target_os = "linux", target_arch = "aarch64"))]
fn program_counter(context: *mut c_void) -> Option<usize> {
	// SAFETY: for SA_SIGINFO handlers the third argument is a ucontext_t.
	let uc = unsafe { (context as *const libc::ucontext_t).as_ref()? };
	Some(uc.uc_mcontext.pc as usize)
}

#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
fn program_counter(context: *mut c_void) -> Option<usize> {
	// SAFETY: for SA_SIGINFO handlers the third argument is a ucontext_t whose
	// machine context pointer is valid for the duration of the handler.
	let mcontext = unsafe { (context as *const libc::ucontext_t).as_ref()?.uc_mcontext.as_ref()? };
	Some(mcontext.__ss.__rip as usize)
}

#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
fn program_counter(context: *mut c_void) -> Option<usize> {
	// SAFETY: as above.
	let mcontext = unsafe { (context as *const libc::ucontext_t).as_ref()?.uc_mcontext.as_ref()? };
	Some(mcontext.__ss.__pc as usize)
}

#[cfg(not(any(
	all(target_os = "linux", any(target_arch = "x86_64", target_arch = "x86", target_arch = "aarch64")),
	all(target_os = "macos", any(target_arch = "x86_64", target_arch = "aarch64")),
)))]
fn program_counter(_context: *mut c_void) -> Option<usize> {
	None
}

fn restore_previous(state: Option<&HandlerState>, signal: c_int) {
	let action = state
		.and_then(|state| state.previous_for(signal))
		.copied()
		.unwrap_or_else(default_action);

	// SAFETY: `action` is either the disposition saved at install time or
	// SIG_DFL.
	unsafe {
		libc::sigaction(signal, &action, ptr::null_mut());
	}
}

extern "C" fn handle_fault(signal: c_int, info: *mut libc::siginfo_t, context: *mut c_void) {
	let state = current_state();

	if !IN_FAULT.swap(true, Ordering::SeqCst) {
		if let Some(state) = state {
			let _ = state
				.runtime
				.report_exception(signal as u32, fault_address(info, context));
			state.runtime.shutdown();
		}
	}

	restore_previous(state, signal);

	// The signal is blocked while this filter runs, so the re-raised one is
	// delivered to the restored disposition once we return.
	// SAFETY: raise is async-signal-safe.
	unsafe {
		libc::raise(signal);
	}
}
