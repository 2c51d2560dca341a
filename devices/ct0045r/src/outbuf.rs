//! Bounded FIFO holding bytes waiting for the line.

use std::collections::VecDeque;

use wctablet_core::{DeviceError, Result};

/// Default capacity, well above the largest single reply
pub const DEFAULT_CAPACITY: usize = 512;

#[derive(Debug, Clone)]
pub struct OutputBuffer {
    buf: VecDeque<u8>,
    capacity: usize,
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free space left
    #[inline(always)]
    pub fn available(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Queue `bytes` at the tail. Either every byte is queued or, if they
    /// would not fit, none are and the buffer is left untouched.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.available() {
            return Err(DeviceError::OutputOverflow {
                needed: bytes.len(),
                available: self.available(),
            });
        }
        self.buf.extend(bytes);
        Ok(())
    }

    /// Pop up to `max` bytes from the head, in order
    pub fn drain(&mut self, max: usize) -> Vec<u8> {
        let n = max.min(self.buf.len());
        self.buf.drain(..n).collect()
    }

    /// Copy of the pending bytes, head first
    pub fn to_vec(&self) -> Vec<u8> {
        self.buf.iter().copied().collect()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}
