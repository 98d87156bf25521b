// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Raw return-address stack traces.
//!
//! Frames carry only an instruction address; symbolication happens on the
//! collector side. Traces are ordered oldest call first, with the precise fault
//! address (when known) appended as the newest frame. Return addresses point
//! just past a call instruction, so the fault address is recorded separately
//! rather than inferred from the walked frames.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Upper bound on walked frames per trace.
pub const MAX_FRAMES: usize = 256;

/// Hex digits in a formatted address (pointer width, zero padded).
pub const ADDR_HEX_WIDTH: usize = std::mem::size_of::<usize>() * 2;

/// Format an address as fixed-width, `0x`-prefixed lowercase hex.
pub fn format_address(addr: usize) -> String {
	format!("0x{addr:0width$x}", width = ADDR_HEX_WIDTH)
}

fn parse_address(s: &str) -> Result<usize, CoreError> {
	let digits = s
		.strip_prefix("0x")
		.or_else(|| s.strip_prefix("0X"))
		.unwrap_or(s);
	usize::from_str_radix(digits, 16).map_err(|_| CoreError::InvalidAddress(s.to_string()))
}

/// A single stack frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
	pub instruction_addr: usize,
}

impl Frame {
	pub fn new(instruction_addr: usize) -> Self {
		Self { instruction_addr }
	}

	/// The address as it is sent to the collector.
	pub fn formatted_addr(&self) -> String {
		format_address(self.instruction_addr)
	}
}

#[derive(Serialize, Deserialize)]
struct FrameRepr {
	instruction_addr: String,
}

impl Serialize for Frame {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		FrameRepr {
			instruction_addr: self.formatted_addr(),
		}
		.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Frame {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let repr = FrameRepr::deserialize(deserializer)?;
		parse_address(&repr.instruction_addr)
			.map(Frame::new)
			.map_err(serde::de::Error::custom)
	}
}

/// Ordered frames, oldest call first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stacktrace {
	pub frames: Vec<Frame>,
}

impl Stacktrace {
	/// The "no stack available" sentinel.
	pub fn empty() -> Self {
		Self { frames: Vec::new() }
	}

	/// Build a trace from addresses in walk order (innermost first).
	///
	/// An empty walk yields the empty sentinel even when `top_address` is set.
	/// A null `top_address` is treated as unknown.
	pub fn from_walk(walked: &[usize], top_address: Option<usize>) -> Self {
		if walked.is_empty() {
			return Self::empty();
		}

		let mut frames: Vec<Frame> = walked.iter().rev().copied().map(Frame::new).collect();
		if let Some(top) = top_address.filter(|addr| *addr != 0) {
			frames.push(Frame::new(top));
		}

		Self { frames }
	}

	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	pub fn len(&self) -> usize {
		self.frames.len()
	}

	/// The newest frame (the fault frame when one was recorded).
	pub fn top(&self) -> Option<&Frame> {
		self.frames.last()
	}
}

/// Synthetic single-thread wrapper around a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
	pub stacktrace: Stacktrace,
}

impl ThreadRecord {
	/// Wrap a trace, or `None` for the empty sentinel.
	pub fn wrap(stacktrace: Stacktrace) -> Option<Self> {
		if stacktrace.is_empty() {
			None
		} else {
			Some(Self { stacktrace })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn format_address_is_fixed_width() {
		let formatted = format_address(0x401000);
		assert_eq!(formatted.len(), 2 + ADDR_HEX_WIDTH);
		assert!(formatted.starts_with("0x"));
		assert!(formatted.ends_with("401000"));
	}

	#[test]
	fn empty_walk_is_sentinel_even_with_top_address() {
		let trace = Stacktrace::from_walk(&[], Some(0x401000));
		assert!(trace.is_empty());
		assert!(ThreadRecord::wrap(trace).is_none());
	}

	#[test]
	fn walk_is_reversed_to_oldest_first() {
		let trace = Stacktrace::from_walk(&[0x30, 0x20, 0x10], None);
		let addrs: Vec<usize> = trace.frames.iter().map(|f| f.instruction_addr).collect();
		assert_eq!(addrs, vec![0x10, 0x20, 0x30]);
	}

	#[test]
	fn fault_address_is_appended_last() {
		let trace = Stacktrace::from_walk(&[0x30, 0x20, 0x10], Some(0x0040_1000));
		assert_eq!(trace.len(), 4);
		assert_eq!(trace.top(), Some(&Frame::new(0x0040_1000)));
	}

	#[test]
	fn null_fault_address_is_not_appended() {
		let trace = Stacktrace::from_walk(&[0x10], Some(0));
		assert_eq!(trace.len(), 1);
	}

	#[test]
	fn frame_serializes_as_hex_string() {
		let json = serde_json::to_value(Frame::new(0xdead)).unwrap();
		assert_eq!(json["instruction_addr"], format_address(0xdead));
	}

	#[test]
	fn frame_rejects_garbage_address() {
		let result: Result<Frame, _> =
			serde_json::from_value(serde_json::json!({ "instruction_addr": "0xnope" }));
		assert!(result.is_err());
	}

	proptest! {
		#[test]
		fn walked_frames_are_kept_under_fault_frame(
			walked in prop::collection::vec(1usize.., 1..MAX_FRAMES),
			top in 1usize..,
		) {
			let trace = Stacktrace::from_walk(&walked, Some(top));
			prop_assert_eq!(trace.len(), walked.len() + 1);
			prop_assert_eq!(trace.top().unwrap().instruction_addr, top);
			prop_assert_eq!(trace.frames[0].instruction_addr, *walked.last().unwrap());
		}

		#[test]
		fn frame_json_roundtrip(addr in any::<usize>()) {
			let json = serde_json::to_string(&Frame::new(addr)).unwrap();
			let parsed: Frame = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(parsed.instruction_addr, addr);
		}
	}
}
