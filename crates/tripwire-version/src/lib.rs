// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Build and release information attached to every crash report.
//!
//! The release tag is `{version}-{tier}`, where the tier comes from the
//! `TRIPWIRE_TIER` environment variable at build time (`local` when unset).
//! The git SHA is reported as the event `dist`.

shadow_rs::shadow!(build);

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = env!("TRIPWIRE_PLATFORM");

/// Release channel the binary was built for.
pub const TIER: &str = env!("TRIPWIRE_TIER");

/// Release identifier sent with every event.
pub const RELEASE_TAG: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("TRIPWIRE_TIER"));

/// Build information for the running binary.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
	pub version: &'static str,
	pub tier: &'static str,
	pub release_tag: &'static str,
	pub git_sha: &'static str,
	pub build_timestamp: &'static str,
	pub platform: &'static str,
}

impl BuildInfo {
	/// Compile-time build information.
	#[allow(clippy::const_is_empty)]
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			tier: TIER,
			release_tag: RELEASE_TAG,
			git_sha: if build::SHORT_COMMIT.is_empty() {
				"unknown"
			} else {
				build::SHORT_COMMIT
			},
			build_timestamp: build::BUILD_TIME,
			platform: PLATFORM,
		}
	}

	/// Git SHA usable as a distribution tag, if the build had one.
	pub fn dist(&self) -> Option<&'static str> {
		if self.git_sha == "unknown" {
			None
		} else {
			Some(self.git_sha)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn release_tag_is_version_and_tier() {
		let info = BuildInfo::current();
		assert_eq!(info.release_tag, format!("{}-{}", info.version, info.tier));
	}

	#[test]
	fn tier_is_never_empty() {
		assert!(!TIER.is_empty());
	}

	#[test]
	fn platform_format_is_valid() {
		assert!(PLATFORM.contains('-'));
	}

	#[test]
	fn dist_hides_unknown_sha() {
		let info = BuildInfo {
			git_sha: "unknown",
			..BuildInfo::current()
		};
		assert_eq!(info.dist(), None);
	}
}
