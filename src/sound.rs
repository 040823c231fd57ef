//! Sound effects as a fire-and-forget side channel.
//!
//! A sink is constructed explicitly and handed to the driver. It is armed on
//! the first user interaction (`resume`) and released on shutdown. No method
//! returns an error or blocks, since a failed sound must never stall a frame.

use std::io::Write;

pub trait SoundSink {
    fn play_launch(&mut self);
    fn play_explosion(&mut self, size: f32);

    /// First user interaction; sinks that need a gesture to start audio
    /// begin producing sound from here.
    fn resume(&mut self) {}

    fn release(&mut self) {}
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct Silent;

impl SoundSink for Silent {
    fn play_launch(&mut self) {}
    fn play_explosion(&mut self, _size: f32) {}
}

/// Explosions smaller than this don't ring the bell.
const BELL_MIN_SIZE: f32 = 0.5;

/// Rings the terminal bell.
pub struct Bell<W: Write> {
    out: Option<W>,
    armed: bool,
}

impl<W: Write> Bell<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Some(out),
            armed: false,
        }
    }

    fn ring(&mut self) {
        if !self.armed {
            return;
        }
        let Some(out) = self.out.as_mut() else {
            return;
        };
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            log::warn!("terminal bell failed, muting: {e}");
            self.out = None;
        }
    }
}

impl<W: Write> SoundSink for Bell<W> {
    fn play_launch(&mut self) {
        self.ring();
    }

    fn play_explosion(&mut self, size: f32) {
        if size >= BELL_MIN_SIZE {
            self.ring();
        }
    }

    fn resume(&mut self) {
        if !self.armed && self.out.is_some() {
            log::debug!("terminal bell armed");
        }
        self.armed = true;
    }

    fn release(&mut self) {
        self.armed = false;
        self.out = None;
    }
}
