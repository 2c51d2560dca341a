//! Core SerialDevice trait and related types.

use std::fmt;
use std::time::Duration;

use crate::channel::{OutboundChannel, Result, TimerHandle};

/// Static information about an emulated device for selection and diagnostics
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo {
    pub name: &'static str,
    pub cli_name: &'static str,
    /// Model and firmware revision as reported on the wire
    pub model: &'static str,
    /// Line speed advertised in the device's configuration reply
    pub default_baud: u32,
}

/// Observable session state. Informational only, never gates input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceState {
    /// The power-up banner has not been fully transmitted yet
    #[default]
    Initializing,
    Ready,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// One absolute pointer sample from the input source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointerSample {
    pub x: u16,
    pub y: u16,
    /// Wheel delta. Captured but not encoded by current devices.
    pub z: i16,
    /// Button bitmask. Captured but not encoded by current devices.
    pub buttons: u32,
}

impl PointerSample {
    pub fn new(x: u16, y: u16) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }
}

/// Counters kept per session for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Commands recognized from the host
    pub commands: u64,
    /// Times the query buffer was reset without a match
    pub resyncs: u64,
    /// Appends rejected because the output buffer was full
    pub output_overflows: u64,
    /// Bytes lost to rejected appends
    pub dropped_bytes: u64,
    /// Bytes handed to the outbound channel
    pub bytes_sent: u64,
    /// Drain ticks run
    pub ticks: u64,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commands={} resyncs={} overflows={} dropped={}B sent={}B ticks={}",
            self.commands,
            self.resyncs,
            self.output_overflows,
            self.dropped_bytes,
            self.bytes_sent,
            self.ticks
        )
    }
}

/// Core device trait - object-safe for `dyn SerialDevice`
///
/// The host calls every method from one sequential context. None of them may
/// block or perform I/O of their own.
pub trait SerialDevice {
    /// Get device info (instance method for object safety)
    fn info(&self) -> &'static DeviceInfo;

    /// Deliver one byte received from the host
    fn receive(&mut self, byte: u8) -> Result<()>;

    /// Deliver one pointer sample from the input source
    fn pointer_event(&mut self, sample: PointerSample) -> Result<()>;

    /// A timer scheduled by the device expired. Returns the bytes written.
    fn on_timer(&mut self, handle: TimerHandle, channel: &mut dyn OutboundChannel)
        -> Result<usize>;

    fn state(&self) -> DeviceState;

    fn diagnostics(&self) -> Diagnostics;

    /// Interval between drain ticks
    fn transmit_interval(&self) -> Duration;

    /// Detach the host, cancelling any pending timer
    fn close(self: Box<Self>) -> Result<Diagnostics>;
}
