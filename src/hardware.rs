//! # Hardware-access layer.
//!
//! [`Hardware`] is the narrow contract of the device-access library: a one-time
//! `init` and a matching `shutdown`. [`HardwareSession`] pairs them so that
//! `shutdown` runs exactly once after a successful `init`.

use crate::error::HardwareError;
use crate::events::{Bus, Event, EventKind};

/// One-time setup and teardown of the device-access library.
pub trait Hardware: Send + Sync + 'static {
    /// Initializes the library.
    fn init(&self) -> Result<(), HardwareError>;

    /// Releases the library.
    fn shutdown(&self) -> Result<(), HardwareError>;
}

/// An initialized hardware library; shuts it down when closed or dropped.
pub(crate) struct HardwareSession<'a> {
    hw: &'a dyn Hardware,
    bus: Bus,
    closed: bool,
}

impl<'a> HardwareSession<'a> {
    /// Initializes `hw`, returning a session on success.
    pub(crate) fn open(hw: &'a dyn Hardware, bus: Bus) -> Result<Self, HardwareError> {
        hw.init()?;
        Ok(Self {
            hw,
            bus,
            closed: false,
        })
    }

    /// Shuts the library down and reports the result; never fails.
    pub(crate) fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let result = match self.hw.shutdown() {
            Ok(()) => "success".to_string(),
            Err(e) => e.message,
        };
        self.bus
            .publish(Event::new(EventKind::HardwareShutdown).with_reason(result));
    }
}

impl Drop for HardwareSession<'_> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
