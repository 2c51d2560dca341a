//! Tokio host adapter: drives a device from a byte link, a pointer source and
//! its transmit timer.

use std::collections::HashMap;
use std::error::Error;
use std::future::Future;
use std::time::Duration;

use futures::future::OptionFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tracing::{debug, info, trace, warn};
use wctablet_core::{
    DeviceError, Diagnostics, OutboundChannel, Result, SerialDevice, Timer, TimerHandle,
};

use crate::pointer::SampleStream;

/// One-shot timers backed by spawned sleeps. Expired handles are reported on
/// the receiver returned by [`TokioTimer::new`].
#[derive(Debug)]
pub struct TokioTimer {
    next: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
    expired: UnboundedSender<TimerHandle>,
}

impl TokioTimer {
    pub fn new() -> (Self, UnboundedReceiver<TimerHandle>) {
        let (expired, rx) = unbounded_channel();
        let timer = Self {
            next: 0,
            tasks: HashMap::new(),
            expired,
        };
        (timer, rx)
    }
}

impl Timer for TokioTimer {
    fn schedule_once(&mut self, after: Duration) -> TimerHandle {
        self.tasks.retain(|_, task| !task.is_finished());

        let handle = TimerHandle(self.next);
        self.next += 1;
        let expired = self.expired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // receiver gone means the host loop already exited
            let _ = expired.send(handle);
        });
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) -> Result<()> {
        match self.tasks.remove(&handle) {
            Some(task) => {
                task.abort();
                Ok(())
            },
            // fired and pruned, its expiry may still be queued
            None if handle.0 < self.next => {
                trace!(?handle, "cancelled timer already fired");
                Ok(())
            },
            None => Err(DeviceError::SchedulerCancel(format!(
                "{handle:?} was never scheduled"
            ))),
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

/// Outbound channel staging at most `burst` bytes per tick for an async writer
#[derive(Debug, Default)]
pub struct StagedLine {
    staged: Vec<u8>,
    burst: usize,
}

impl StagedLine {
    pub fn new(burst: usize) -> Self {
        Self {
            staged: Vec::with_capacity(burst),
            burst,
        }
    }

    /// Write out everything staged since the last flush
    pub async fn flush<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> std::io::Result<usize> {
        if self.staged.is_empty() {
            return Ok(0);
        }
        writer.write_all(&self.staged).await?;
        writer.flush().await?;
        let len = self.staged.len();
        self.staged.clear();
        Ok(len)
    }
}

impl OutboundChannel for StagedLine {
    fn writable_capacity(&self) -> usize {
        self.burst.saturating_sub(self.staged.len())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let available = self.writable_capacity();
        if bytes.len() > available {
            return Err(DeviceError::OutputOverflow {
                needed: bytes.len(),
                available,
            });
        }
        self.staged.extend_from_slice(bytes);
        Ok(())
    }
}

/// An attached device and the line it transmits on
pub struct Host<W> {
    device: Box<dyn SerialDevice>,
    expired: UnboundedReceiver<TimerHandle>,
    line: StagedLine,
    writer: W,
}

impl<W: AsyncWrite + Unpin> Host<W> {
    pub fn new(
        device: Box<dyn SerialDevice>,
        expired: UnboundedReceiver<TimerHandle>,
        writer: W,
        burst: usize,
    ) -> Self {
        Self {
            device,
            expired,
            line: StagedLine::new(burst),
            writer,
        }
    }

    /// Serve the host until the link closes or `shutdown` resolves, then
    /// close the device and return its final counters.
    ///
    /// The device is closed on line errors too. If that close also fails,
    /// both errors are reported.
    pub async fn run<R, F>(
        mut self,
        reader: R,
        pointer: Option<SampleStream>,
        shutdown: F,
    ) -> std::result::Result<Diagnostics, Box<dyn Error>>
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        let info = self.device.info();
        info!(device = info.name, "serving host");

        let served = self.serve(reader, pointer, shutdown).await;
        match (served, self.device.close()) {
            (Ok(()), Ok(diagnostics)) => Ok(diagnostics),
            (Ok(()), Err(e)) => Err(e.into()),
            (Err(e), Ok(diagnostics)) => {
                warn!(%diagnostics, "tablet detached after line error");
                Err(e.into())
            },
            (Err(line), Err(close)) => {
                Err(format!("{line}; closing the device also failed: {close}").into())
            },
        }
    }

    /// Inbound bytes, pointer samples and ticks are handled one at a time, in
    /// arrival order.
    async fn serve<R, F>(
        &mut self,
        mut reader: R,
        mut pointer: Option<SampleStream>,
        shutdown: F,
    ) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = [0u8; 64];

        loop {
            tokio::select! {
                read = reader.read(&mut buf) => {
                    let len = read?;
                    if len == 0 {
                        info!("host closed the line");
                        return Ok(());
                    }
                    for &byte in &buf[..len] {
                        if let Err(e) = self.device.receive(byte) {
                            debug!(error = %e, "reply dropped");
                        }
                    }
                },
                Some(handle) = self.expired.recv() => {
                    if let Err(e) = self.device.on_timer(handle, &mut self.line) {
                        warn!(error = %e, "tick failed");
                    }
                    self.line.flush(&mut self.writer).await?;
                },
                Some(sample) = OptionFuture::from(pointer.as_mut().map(|p| p.next())) => {
                    match sample {
                        Some(sample) => {
                            if let Err(e) = self.device.pointer_event(sample) {
                                debug!(error = %e, ?sample, "pointer sample dropped");
                            }
                        },
                        None => {
                            debug!("pointer source exhausted");
                            pointer = None;
                        },
                    }
                },
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    return Ok(());
                },
            }
        }
    }
}
