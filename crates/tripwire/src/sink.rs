// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local fallback output for crash messages.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Destination for the local copy of a crash message.
///
/// Written before delivery so a crash stays visible even when the collector
/// never receives it.
pub trait LocalSink: Send + Sync {
	fn report(&self, message: &str);
}

/// Writes one line per message to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LocalSink for StderrSink {
	fn report(&self, message: &str) {
		let mut stderr = std::io::stderr().lock();
		let _ = writeln!(stderr, "{message}");
		let _ = stderr.flush();
	}
}

/// Collects messages in memory.
#[derive(Debug, Default)]
pub struct BufferSink {
	lines: Mutex<Vec<String>>,
}

impl BufferSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lines(&self) -> Vec<String> {
		self
			.lines
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.clone()
	}
}

impl LocalSink for BufferSink {
	fn report(&self, message: &str) {
		self
			.lines
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.push(message.to_string());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn buffer_sink_keeps_order() {
		let sink = BufferSink::new();
		sink.report("first");
		sink.report("second");
		assert_eq!(sink.lines(), vec!["first", "second"]);
	}
}
