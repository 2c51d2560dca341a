//! Emulation of the Wacom CT-0045R (PenPartner) serial pen tablet.
//!
//! The host talks to the tablet with short ASCII commands. The tablet answers
//! a handful of them and otherwise streams 7 byte coordinate packets, paced at
//! the speed of the emulated serial line.

use std::time::Duration;

use tracing::{info, warn};
use wctablet_core::{
    DeviceInfo, DeviceState, Diagnostics, OutboundChannel, PointerSample, Result, SerialDevice,
    Timer, TimerHandle,
};

pub mod abi;
pub mod matcher;
pub mod outbuf;
pub mod packet;
pub mod scheduler;
pub mod session;
pub mod types;

pub use scheduler::Scheduler;
pub use session::{transmit_interval_for_baud, Session, SessionConfig, DEFAULT_BAUD};
pub use types::Command;

/// Static device info for selection and diagnostics
pub static INFO: DeviceInfo = DeviceInfo {
    name: "Wacom PenPartner CT-0045R",
    cli_name: "ct0045r",
    model: "CT-0045R,V1.3-5",
    default_baud: DEFAULT_BAUD,
};

/// An attached CT-0045R: one host session and its transmission scheduler
#[derive(Debug)]
pub struct Ct0045r<T: Timer> {
    session: Session,
    scheduler: Scheduler<T>,
}

impl<T: Timer> Ct0045r<T> {
    /// Power up the tablet for a newly attached host and arm the first tick
    pub fn open(config: SessionConfig, timer: T) -> Result<Self> {
        let session = Session::new(config)?;
        let mut scheduler = Scheduler::new(timer, session.transmit_interval());
        scheduler.start();
        info!(
            device = INFO.name,
            interval = ?config.transmit_interval,
            capacity = config.output_capacity,
            "tablet attached"
        );
        Ok(Self { session, scheduler })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn scheduler(&self) -> &Scheduler<T> {
        &self.scheduler
    }

    /// Detach the host. Fails if the pending tick could not be cancelled.
    pub fn close(mut self) -> Result<Diagnostics> {
        self.scheduler.cancel()?;
        let diagnostics = self.session.diagnostics();
        info!(%diagnostics, "tablet detached");
        Ok(diagnostics)
    }
}

impl<T: Timer> Drop for Ct0045r<T> {
    fn drop(&mut self) {
        // no-op after a successful close
        if let Err(e) = self.scheduler.cancel() {
            warn!(error = %e, "pending tick outlived the tablet");
        }
    }
}

impl<T: Timer> SerialDevice for Ct0045r<T> {
    fn info(&self) -> &'static DeviceInfo {
        &INFO
    }

    fn receive(&mut self, byte: u8) -> Result<()> {
        self.session.receive(byte).map(|_| ())
    }

    fn pointer_event(&mut self, sample: PointerSample) -> Result<()> {
        self.session.on_pointer_sample(sample)
    }

    fn on_timer(
        &mut self,
        handle: TimerHandle,
        channel: &mut dyn OutboundChannel,
    ) -> Result<usize> {
        self.scheduler.tick(handle, &mut self.session, channel)
    }

    fn state(&self) -> DeviceState {
        self.session.state()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.session.diagnostics()
    }

    fn transmit_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    fn close(self: Box<Self>) -> Result<Diagnostics> {
        Ct0045r::close(*self)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wctablet_core::DeviceError;

    use super::*;
    use crate::abi::{BANNER, MODEL_STRING};
    use crate::scheduler::tests::{Line, ManualTimer};

    /// Timer whose record outlives the tablet that owns it
    #[derive(Debug, Default, Clone)]
    struct SharedTimer(Rc<RefCell<ManualTimer>>);

    impl Timer for SharedTimer {
        fn schedule_once(&mut self, after: Duration) -> TimerHandle {
            self.0.borrow_mut().schedule_once(after)
        }

        fn cancel(&mut self, handle: TimerHandle) -> Result<()> {
            self.0.borrow_mut().cancel(handle)
        }
    }

    #[test]
    fn handshake_through_device() {
        let mut tablet = Ct0045r::open(SessionConfig::default(), ManualTimer::default()).unwrap();
        let mut line = Line {
            window: 1,
            ..Default::default()
        };
        assert_eq!(tablet.state(), DeviceState::Initializing);

        for b in b"~#~#" {
            tablet.receive(*b).unwrap();
        }
        while tablet.session().pending_len() > 0 {
            let handle = tablet.scheduler().pending().unwrap();
            assert!(tablet.on_timer(handle, &mut line).unwrap() <= 1);
        }

        assert_eq!(tablet.state(), DeviceState::Ready);
        assert_eq!(&line.sent[..BANNER.len()], BANNER);
        assert_eq!(&line.sent[BANNER.len()..], MODEL_STRING);
        assert_eq!(tablet.diagnostics().bytes_sent, 79);
        assert_eq!(tablet.transmit_interval(), transmit_interval_for_baud(9600));
    }

    #[test]
    fn close_cancels_pending_tick() {
        let timer = SharedTimer::default();
        let tablet = Ct0045r::open(SessionConfig::default(), timer.clone()).unwrap();
        let handle = tablet.scheduler().pending().unwrap();

        let mut device: Box<dyn SerialDevice> = Box::new(tablet);
        device.pointer_event(PointerSample::new(5, 5)).unwrap();
        let diagnostics = device.close().unwrap();

        assert_eq!(diagnostics.ticks, 0);
        assert_eq!(timer.0.borrow().cancelled, [handle]);
        assert!(timer.0.borrow().armed.is_empty());
    }

    #[test]
    fn drop_cancels_pending_tick() {
        let timer = SharedTimer::default();
        let tablet = Ct0045r::open(SessionConfig::default(), timer.clone()).unwrap();
        let handle = tablet.scheduler().pending().unwrap();
        drop(tablet);
        assert_eq!(timer.0.borrow().cancelled, [handle]);
    }

    #[test]
    fn cancel_failure_is_surfaced() {
        let mut timer = ManualTimer::default();
        timer.fail_cancel = true;
        let tablet = Ct0045r::open(SessionConfig::default(), timer).unwrap();
        assert!(matches!(tablet.close(), Err(DeviceError::SchedulerCancel(_))));
    }
}
