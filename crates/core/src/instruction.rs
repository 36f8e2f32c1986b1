// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal instructions: a (signal, wait) pair used in stop and drain
//! sequences, plus the closed table of configurable signal names.

use std::fmt;
use std::time::Duration;

use nix::sys::signal::Signal;
use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;

use crate::duration::{format_duration, parse_duration};

/// One step of a signal escalation: send `signal`, then wait `wait`
/// before checking whether the process died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub signal: Signal,
    pub wait: Duration,
}

impl Instruction {
    pub fn new(signal: Signal, wait: Duration) -> Self {
        Self { signal, wait }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", signal_name(self.signal), format_duration(self.wait))
    }
}

/// Escalation used when a program's stop sequence is empty: a polite
/// SIGQUIT with a five second grace, then SIGKILL.
pub fn default_stop_sequence() -> Vec<Instruction> {
    vec![
        Instruction::new(Signal::SIGQUIT, Duration::from_secs(5)),
        Instruction::new(Signal::SIGKILL, Duration::from_secs(0)),
    ]
}

/// Map a lowercase signal mnemonic to the OS signal. The table is closed;
/// anything else fails configuration decoding.
pub fn signal_from_name(name: &str) -> Option<Signal> {
    let signal = match name {
        "abrt" => Signal::SIGABRT,
        "alrm" => Signal::SIGALRM,
        "bus" => Signal::SIGBUS,
        "chld" => Signal::SIGCHLD,
        "cont" => Signal::SIGCONT,
        "fpe" => Signal::SIGFPE,
        "hup" => Signal::SIGHUP,
        "ill" => Signal::SIGILL,
        "int" => Signal::SIGINT,
        "io" => Signal::SIGIO,
        // iot is the historical alias for abrt
        "iot" => Signal::SIGABRT,
        "kill" => Signal::SIGKILL,
        "pipe" => Signal::SIGPIPE,
        "prof" => Signal::SIGPROF,
        "quit" => Signal::SIGQUIT,
        "segv" => Signal::SIGSEGV,
        "stop" => Signal::SIGSTOP,
        "sys" => Signal::SIGSYS,
        "term" => Signal::SIGTERM,
        "trap" => Signal::SIGTRAP,
        "tstp" => Signal::SIGTSTP,
        "ttin" => Signal::SIGTTIN,
        "ttou" => Signal::SIGTTOU,
        "urg" => Signal::SIGURG,
        "usr1" => Signal::SIGUSR1,
        "usr2" => Signal::SIGUSR2,
        "vtalrm" => Signal::SIGVTALRM,
        "winch" => Signal::SIGWINCH,
        "xcpu" => Signal::SIGXCPU,
        "xfsz" => Signal::SIGXFSZ,
        _ => return None,
    };
    Some(signal)
}

/// Reverse of [`signal_from_name`] for display and snapshots.
pub fn signal_name(signal: Signal) -> &'static str {
    match signal {
        Signal::SIGABRT => "abrt",
        Signal::SIGALRM => "alrm",
        Signal::SIGBUS => "bus",
        Signal::SIGCHLD => "chld",
        Signal::SIGCONT => "cont",
        Signal::SIGFPE => "fpe",
        Signal::SIGHUP => "hup",
        Signal::SIGILL => "ill",
        Signal::SIGINT => "int",
        Signal::SIGIO => "io",
        Signal::SIGKILL => "kill",
        Signal::SIGPIPE => "pipe",
        Signal::SIGPROF => "prof",
        Signal::SIGQUIT => "quit",
        Signal::SIGSEGV => "segv",
        Signal::SIGSTOP => "stop",
        Signal::SIGSYS => "sys",
        Signal::SIGTERM => "term",
        Signal::SIGTRAP => "trap",
        Signal::SIGTSTP => "tstp",
        Signal::SIGTTIN => "ttin",
        Signal::SIGTTOU => "ttou",
        Signal::SIGURG => "urg",
        Signal::SIGUSR1 => "usr1",
        Signal::SIGUSR2 => "usr2",
        Signal::SIGVTALRM => "vtalrm",
        Signal::SIGWINCH => "winch",
        Signal::SIGXCPU => "xcpu",
        Signal::SIGXFSZ => "xfsz",
        _ => "unknown",
    }
}

/// The `{signal, wait}` table as written in configuration files.
/// `wait` accepts either a human duration string ("5s", "100ms") or a
/// bare integer of seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstructionSpec {
    pub signal: SignalSpec,
    pub wait: WaitSpec,
}

impl InstructionSpec {
    pub fn to_instruction(&self) -> Instruction {
        Instruction::new(self.signal.0, self.wait.0)
    }
}

/// A signal mnemonic decoded through the closed name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSpec(pub Signal);

impl<'de> Deserialize<'de> for SignalSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        signal_from_name(&name)
            .map(SignalSpec)
            .ok_or_else(|| de::Error::custom(format!("invalid signal name: {}", name)))
    }
}

/// A wait duration decoded from a string or an integer of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec(pub Duration);

impl<'de> Deserialize<'de> for WaitSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(WaitVisitor)
    }
}

struct WaitVisitor;

impl Visitor<'_> for WaitVisitor {
    type Value = WaitSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a duration string like \"5s\" or an integer of seconds")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_duration(v).map(WaitSpec).map_err(de::Error::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(WaitSpec(Duration::from_secs(v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        if v < 0 {
            return Err(de::Error::custom("wait cannot be negative"));
        }
        Ok(WaitSpec(Duration::from_secs(v as u64)))
    }
}

#[cfg(test)]
#[path = "instruction_tests.rs"]
mod tests;
