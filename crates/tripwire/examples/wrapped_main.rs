// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Minimal application wrapped with crash reporting.
//!
//! ```bash
//! TRIPWIRE_DISABLED=1 RUST_LOG=tripwire=debug cargo run -p tripwire --example wrapped_main -- --panic
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let code = tripwire::run_wrapped(cfg!(debug_assertions), std::env::args().collect(), app_main);
	std::process::exit(code);
}

fn app_main(args: &[String]) -> i32 {
	info!(args = ?args, "Application started");

	if args.iter().any(|a| a == "--panic") {
		panic!("requested panic");
	}
	0
}
