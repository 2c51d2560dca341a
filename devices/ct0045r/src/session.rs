//! Per-host protocol state: command recognition, replies and pointer packets.

use std::time::Duration;

use tracing::{trace, warn};
use wctablet_core::{DeviceState, Diagnostics, PointerSample, Result};

use crate::abi::{BANNER, CONFIG_STRING, IDLE_FILLER, MODEL_STRING, TILT_PARAM_OFFSET};
use crate::matcher::{Match, Matcher};
use crate::outbuf::{OutputBuffer, DEFAULT_CAPACITY};
use crate::packet::{encode_pointer, tilt_response};
use crate::types::Command;

/// Bits on the line per transmitted byte (start, 8 data, stop)
const BITS_PER_BYTE: u64 = 10;

/// Line speed advertised by the configuration reply
pub const DEFAULT_BAUD: u32 = 9600;

/// Time to transmit one byte at `baud`
pub fn transmit_interval_for_baud(baud: u32) -> Duration {
    Duration::from_nanos(BITS_PER_BYTE * 1_000_000_000 / u64::from(baud.max(1)))
}

/// Identification queries seen before the model string is sent
const HANDSHAKE_REPLY_AT: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub output_capacity: usize,
    pub transmit_interval: Duration,
    /// Drop `@` bytes that arrive while no command is in progress
    pub ignore_idle_filler: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_capacity: DEFAULT_CAPACITY,
            transmit_interval: transmit_interval_for_baud(DEFAULT_BAUD),
            ignore_idle_filler: true,
        }
    }
}

/// State of one attached host
#[derive(Debug, Clone)]
pub struct Session {
    matcher: Matcher,
    outbuf: OutputBuffer,
    handshake: u8,
    banner_pending: usize,
    config: SessionConfig,
    diagnostics: Diagnostics,
}

impl Session {
    /// Start a session with the power-up banner queued for transmission
    pub fn new(config: SessionConfig) -> Result<Self> {
        let mut outbuf = OutputBuffer::with_capacity(config.output_capacity);
        outbuf.append(&BANNER)?;
        Ok(Self {
            matcher: Matcher::new(),
            outbuf,
            handshake: 0,
            banner_pending: BANNER.len(),
            config,
            diagnostics: Diagnostics::default(),
        })
    }

    /// Handle one byte from the host. Returns the command it completed, if
    /// any. An error means the command's reply was dropped.
    pub fn receive(&mut self, byte: u8) -> Result<Option<Command>> {
        if byte == IDLE_FILLER && self.config.ignore_idle_filler && self.matcher.is_idle() {
            return Ok(None);
        }

        let resyncs = self.matcher.resyncs();
        let found = self.matcher.feed(byte);
        self.diagnostics.resyncs += self.matcher.resyncs() - resyncs;

        match found {
            Some(found) => {
                self.on_command(&found)?;
                Ok(Some(found.command()))
            },
            None => Ok(None),
        }
    }

    /// Queue the reply, if any, for a recognized command
    pub fn on_command(&mut self, found: &Match) -> Result<()> {
        let pattern = found.pattern();
        trace!(command = pattern.name, bytes = ?found.bytes(), "host command");
        self.diagnostics.commands += 1;

        match pattern.command {
            Command::Identify => {
                // the tablet answers the second query of the power-up
                // handshake only
                if self.handshake < u8::MAX {
                    self.handshake += 1;
                }
                if self.handshake == HANDSHAKE_REPLY_AT {
                    self.append(MODEL_STRING)?;
                }
            },
            Command::ReadConfig => self.append(CONFIG_STRING)?,
            Command::Tilt => {
                if let Some(&param) = found.bytes().get(TILT_PARAM_OFFSET) {
                    self.append(&tilt_response(param))?;
                }
            },
            Command::Start | Command::Stop | Command::SelfTest | Command::Setting => {},
        }
        Ok(())
    }

    /// Queue one coordinate packet. Samples are never coalesced.
    pub fn on_pointer_sample(&mut self, sample: PointerSample) -> Result<()> {
        self.append(&encode_pointer(&sample))
    }

    /// Queue bytes for the line, counting rejected appends
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.outbuf.append(bytes).inspect_err(|e| {
            self.diagnostics.output_overflows += 1;
            self.diagnostics.dropped_bytes += bytes.len() as u64;
            warn!(error = %e, "output buffer full, dropping {} bytes", bytes.len());
        })
    }

    /// Take up to `writable_capacity` bytes from the head of the buffer
    pub fn drain_tick(&mut self, writable_capacity: usize) -> Vec<u8> {
        let bytes = self.outbuf.drain(writable_capacity);
        self.banner_pending = self.banner_pending.saturating_sub(bytes.len());
        self.diagnostics.ticks += 1;
        self.diagnostics.bytes_sent += bytes.len() as u64;
        bytes
    }

    /// Account for drained bytes the channel refused. They are lost, not retried.
    pub fn discard_unsent(&mut self, len: usize) {
        let len = len as u64;
        self.diagnostics.bytes_sent = self.diagnostics.bytes_sent.saturating_sub(len);
        self.diagnostics.dropped_bytes += len;
    }

    pub fn state(&self) -> DeviceState {
        if self.banner_pending > 0 {
            DeviceState::Initializing
        } else {
            DeviceState::Ready
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Bytes waiting for the line, head first
    pub fn pending(&self) -> Vec<u8> {
        self.outbuf.to_vec()
    }

    pub fn pending_len(&self) -> usize {
        self.outbuf.len()
    }

    /// Unmatched bytes received since the last command
    pub fn query(&self) -> &[u8] {
        self.matcher.query()
    }

    /// Identification queries seen so far (saturating)
    pub fn handshake_count(&self) -> u8 {
        self.handshake
    }

    pub fn transmit_interval(&self) -> Duration {
        self.config.transmit_interval
    }
}
