//! Collaborator traits for the host side of an emulated serial line.
//!
//! A device never performs I/O or waits by itself. The host adapter implements
//! these traits and hands them to the device at the call sites that need them.

use std::time::Duration;

/// Errors that can occur while driving an emulated device
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Output would not fit in the bounded buffer and was dropped whole
    #[error("output overflow: {needed} bytes needed, {available} available")]
    OutputOverflow { needed: usize, available: usize },

    /// A pending timer could not be cancelled on teardown
    #[error("failed to cancel scheduled drain: {0}")]
    SchedulerCancel(String),

    /// The downstream side of the line went away
    #[error("channel closed")]
    ChannelClosed,

    /// Generic IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Opaque token identifying one scheduled timer expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Downstream byte channel towards the host
pub trait OutboundChannel {
    /// How many bytes the channel can accept right now
    fn writable_capacity(&self) -> usize;
    /// Accept bytes for transmission. Must not block.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// One-shot timer primitive.
///
/// On expiry the host passes the returned handle back to the device. Handles
/// that were cancelled or replaced are ignored by the device.
pub trait Timer {
    fn schedule_once(&mut self, after: Duration) -> TimerHandle;
    fn cancel(&mut self, handle: TimerHandle) -> Result<()>;
}
