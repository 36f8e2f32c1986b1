// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! goku-core: shared types for the goku process supervisor.
//!
//! Configuration records, signal instructions, status codes, transport
//! snapshots and the notification record. No process management happens
//! here; the engine crate consumes these types.

pub mod config;
pub mod duration;
pub mod instruction;
pub mod notification;
pub mod settings;
pub mod snapshot;
pub mod status;

pub use config::{read_config, Config, ConfigError};
pub use duration::{format_duration, parse_duration};
pub use instruction::{
    default_stop_sequence, signal_from_name, signal_name, Instruction, InstructionSpec,
};
pub use notification::Notification;
pub use settings::Settings;
pub use snapshot::{ProcessSetSnapshot, ProcessSnapshot, StatusTuple};
pub use status::ProcessStatus;
