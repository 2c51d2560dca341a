//! Core traits and types for wctablet device emulation.
//!
//! This crate provides:
//! - The `SerialDevice` trait, driven by a host adapter
//! - Collaborator traits (`OutboundChannel`, `Timer`) that the host implements
//! - Common types like `DeviceInfo`, `PointerSample`, `Diagnostics`

mod channel;
mod device;

pub use channel::{DeviceError, OutboundChannel, Result, Timer, TimerHandle};
pub use device::{DeviceInfo, DeviceState, Diagnostics, PointerSample, SerialDevice};
