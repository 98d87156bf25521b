// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack capture for crash and message events.

use tripwire_core::{Stacktrace, MAX_FRAMES};

/// Platform facility that walks the calling thread's return addresses.
pub trait StackWalker: Send + Sync {
	/// Fill `buf` innermost-first with return addresses, after skipping the
	/// `skip` frames nearest the caller. Returns how many were written.
	fn walk(&self, skip: usize, buf: &mut [usize]) -> usize;
}

/// Walks the live stack with the `backtrace` crate.
///
/// Only instruction pointers are collected, into the caller's buffer; nothing
/// is resolved or allocated while walking.
#[derive(Debug, Default, Clone, Copy)]
pub struct BacktraceWalker;

impl StackWalker for BacktraceWalker {
	#[inline(never)]
	fn walk(&self, skip: usize, buf: &mut [usize]) -> usize {
		let mut seen = 0;
		let mut count = 0;

		let mut visit = |frame: &backtrace::Frame| {
			if seen < skip {
				seen += 1;
				return true;
			}
			if count == buf.len() {
				return false;
			}
			buf[count] = frame.ip() as usize;
			count += 1;
			true
		};

		// SAFETY: the unix unwinder is reentrant; the crate-wide lock that
		// `trace` takes only serializes dbghelp, and it may already be held by
		// the faulting thread.
		#[cfg(unix)]
		unsafe {
			backtrace::trace_unsynchronized(&mut visit)
		};
		#[cfg(not(unix))]
		backtrace::trace(&mut visit);

		count
	}
}

/// Capture up to [`MAX_FRAMES`] return addresses from the current thread.
///
/// Returns the empty sentinel when nothing was walked. Otherwise frames are
/// oldest-first, with `top_address` (the precise fault location) appended.
pub fn capture_stack_trace(
	walker: &dyn StackWalker,
	top_address: Option<usize>,
	frames_to_skip: usize,
) -> Stacktrace {
	let mut walked = [0usize; MAX_FRAMES];
	let count = walker.walk(frames_to_skip, &mut walked).min(MAX_FRAMES);
	Stacktrace::from_walk(&walked[..count], top_address)
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Pretends the stack is exactly `depth` frames deep.
	struct DepthWalker {
		depth: usize,
	}

	impl StackWalker for DepthWalker {
		fn walk(&self, skip: usize, buf: &mut [usize]) -> usize {
			let available = self.depth.saturating_sub(skip).min(buf.len());
			for (i, slot) in buf.iter_mut().take(available).enumerate() {
				*slot = 0x1000 + (skip + i) * 0x10;
			}
			available
		}
	}

	#[test]
	fn skipping_past_the_stack_yields_empty_sentinel() {
		let walker = DepthWalker { depth: 3 };
		assert!(capture_stack_trace(&walker, None, 3).is_empty());
		assert!(capture_stack_trace(&walker, Some(0x401000), 10).is_empty());
	}

	#[test]
	fn fault_address_is_added_to_walked_frames() {
		let walker = DepthWalker { depth: 3 };
		let trace = capture_stack_trace(&walker, Some(0x0040_1000), 0);
		assert_eq!(trace.len(), 4);
		assert_eq!(trace.top().unwrap().instruction_addr, 0x0040_1000);
		assert_eq!(trace.frames[0].instruction_addr, 0x1020);
	}

	#[test]
	fn walk_is_capped_at_max_frames() {
		let walker = DepthWalker { depth: MAX_FRAMES * 2 };
		assert_eq!(capture_stack_trace(&walker, None, 0).len(), MAX_FRAMES);
	}

	#[test]
	fn backtrace_walker_sees_live_frames() {
		let trace = capture_stack_trace(&BacktraceWalker, None, 0);
		assert!(!trace.is_empty());
	}

	#[test]
	fn backtrace_walker_honours_skip() {
		let full = capture_stack_trace(&BacktraceWalker, None, 0).len();
		assert!(capture_stack_trace(&BacktraceWalker, None, full + 1).is_empty());
	}
}
