// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the tripwire crash-reporting shim.
//!
//! This crate holds the request-scoped data model shared by the shim and its
//! telemetry client adapters:
//! - [`EndpointConfig`]: which collector endpoint and release a process reports to
//! - [`Frame`] / [`Stacktrace`] / [`ThreadRecord`]: raw return-address stacks
//! - [`TelemetryEvent`]: the exception- or message-shaped event handed to a client
//! - [`Level`]: event severity, with the native SDK's numeric codes
//!
//! Nothing in here performs I/O.

pub mod endpoint;
pub mod error;
pub mod event;
pub mod level;
pub mod stacktrace;

pub use endpoint::{EndpointConfig, DSN_DESKTOP, DSN_DEVELOPER};
pub use error::{CoreError, Result};
pub use event::{ExceptionEvent, MessageEvent, TelemetryEvent};
pub use level::Level;
pub use stacktrace::{format_address, Frame, Stacktrace, ThreadRecord, ADDR_HEX_WIDTH, MAX_FRAMES};
