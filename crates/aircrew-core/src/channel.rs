//! Channel cycling for monitor-mode captures

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::Result;
use crate::ops::RadioOps;

/// Steps one radio through a channel sequence with a fixed dwell
///
/// The hopper talks to the OS directly, so it also works on fabricated
/// monitor interfaces. Run it from a thread the orchestrator owns and
/// stop it before any other mutating call touches the same radio.
pub struct ChannelHopper {
    ops: Arc<dyn RadioOps>,
    interface: String,
    channels: Vec<u8>,
    dwell: Duration,
    position: usize,
}

impl ChannelHopper {
    /// Hopper over the 2.4 GHz channels 1 through 13
    pub fn new(ops: Arc<dyn RadioOps>, interface: impl Into<String>, dwell: Duration) -> Self {
        Self {
            ops,
            interface: interface.into(),
            channels: (1..=13).collect(),
            dwell,
            position: 0,
        }
    }

    /// Replace the hop sequence; an empty replacement is ignored
    #[must_use]
    pub fn with_channels(mut self, channels: Vec<u8>) -> Self {
        if !channels.is_empty() {
            self.channels = channels;
            self.position = 0;
        }
        self
    }

    /// Tune to the next channel in the sequence and return it
    pub fn hop(&mut self) -> Result<u8> {
        // position stays below channels.len(), and the sequence is never
        // empty
        let channel = self.channels[self.position];
        self.position = (self.position + 1) % self.channels.len();
        self.ops.set_channel(&self.interface, channel)?;
        Ok(channel)
    }

    /// Hop until `duration` elapses, dwelling after each hop
    pub fn run_for(&mut self, duration: Duration) -> Result<()> {
        let deadline = Instant::now() + duration;
        while Instant::now() < deadline {
            let channel = self.hop()?;
            debug!(target: "wifi", interface = %self.interface, channel, "hopped");
            std::thread::sleep(self.dwell);
        }
        Ok(())
    }

    /// Hop until `stop` is raised; meant for a dedicated thread
    pub fn run_until(&mut self, stop: &AtomicBool) -> Result<()> {
        while !stop.load(Ordering::SeqCst) {
            let channel = self.hop()?;
            debug!(target: "wifi", interface = %self.interface, channel, "hopped");
            std::thread::sleep(self.dwell);
        }
        Ok(())
    }
}
