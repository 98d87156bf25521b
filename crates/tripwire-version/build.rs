// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

fn main() -> shadow_rs::SdResult<()> {
	let os = std::env::var("CARGO_CFG_TARGET_OS").unwrap();
	let arch = std::env::var("CARGO_CFG_TARGET_ARCH").unwrap();
	println!("cargo:rustc-env=TRIPWIRE_PLATFORM={os}-{arch}");

	let tier = std::env::var("TRIPWIRE_TIER")
		.ok()
		.filter(|t| !t.trim().is_empty())
		.unwrap_or_else(|| "local".to_string());
	println!("cargo:rustc-env=TRIPWIRE_TIER={tier}");
	println!("cargo:rerun-if-env-changed=TRIPWIRE_TIER");

	shadow_rs::new()
}
