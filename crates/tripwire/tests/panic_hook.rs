// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use tripwire::{
	run_wrapped_with, BufferSink, FaultHandlerInstaller, Level, PanicHookInstaller, RecordingClient, RuntimeBuilder,
	StackWalker, TelemetryEvent, TelemetryRuntime,
};

struct FixedWalker;

impl StackWalker for FixedWalker {
	fn walk(&self, skip: usize, buf: &mut [usize]) -> usize {
		let frames = [0x30usize, 0x20, 0x10];
		let mut count = 0;
		for (slot, addr) in buf.iter_mut().zip(frames.iter().skip(skip)) {
			*slot = *addr;
			count += 1;
		}
		count
	}
}

fn builder(client: &Arc<RecordingClient>) -> RuntimeBuilder {
	RuntimeBuilder::new(false)
		.client(client.clone())
		.sink(Arc::new(BufferSink::new()))
		.walker(Arc::new(FixedWalker))
}

fn recording_runtime(client: &Arc<RecordingClient>) -> TelemetryRuntime {
	builder(client).init()
}

fn panic_and_catch(message: &'static str) {
	let result = std::panic::catch_unwind(move || {
		panic!("{message}");
	});
	assert!(result.is_err());
}

// The panic hook is process-wide, so every round runs in one test.
#[test]
fn panic_hook_reports_to_latest_runtime_only() {
	// Reported and flushed, runtime left open.
	let client = Arc::new(RecordingClient::new());
	let runtime = recording_runtime(&client);
	PanicHookInstaller.install(&runtime).unwrap();

	panic_and_catch("disk on fire");

	let events = client.events();
	assert_eq!(events.len(), 1);
	let TelemetryEvent::Exception(event) = &events[0] else {
		panic!("expected exception event");
	};
	assert_eq!(event.level, Level::Fatal);
	assert!(event.message.starts_with("panicked at "));
	assert!(event.message.ends_with("disk on fire"));
	assert_eq!(event.thread.as_ref().unwrap().stacktrace.len(), 3);
	assert!(client.flush_calls() >= 1);
	assert!(!runtime.is_closed());

	// Installing again retargets the hook instead of stacking a second one.
	let second = Arc::new(RecordingClient::new());
	PanicHookInstaller.install(&recording_runtime(&second)).unwrap();

	panic_and_catch("second");

	assert_eq!(client.events().len(), 1);
	assert_eq!(second.events().len(), 1);

	// Wrapped rounds shut their runtime down; later panics go to the newest
	// runtime and earlier ones are released.
	let installers: Vec<Box<dyn FaultHandlerInstaller>> = vec![Box::new(PanicHookInstaller)];
	let first_round = Arc::new(RecordingClient::new());
	let second_round = Arc::new(RecordingClient::new());

	run_wrapped_with(builder(&first_round), &installers, Vec::<String>::new(), |_| 0);
	run_wrapped_with(builder(&second_round), &installers, Vec::<String>::new(), |_| {
		panic_and_catch("inside body");
		0
	});

	assert!(first_round.events().is_empty());
	assert_eq!(second_round.events().len(), 1);
	assert_eq!(Arc::strong_count(&first_round), 1);

	// A shut-down runtime left in the hook reports nothing.
	panic_and_catch("after shutdown");
	assert_eq!(second_round.events().len(), 1);

	drop(runtime);
	assert_eq!(Arc::strong_count(&client), 1);
}
