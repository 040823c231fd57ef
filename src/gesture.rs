//! Turns a stream of hand-gesture frames into launch triggers.
//!
//! Closing the hand charges a shot, opening it fires at the hand's position.
//! A charge expires if no fist has been seen for [`CHARGE_TIMEOUT`], and shots
//! are spaced by at least [`FIRE_COOLDOWN`].

use std::time::Duration;

pub const CHARGE_TIMEOUT: Duration = Duration::from_millis(1000);
pub const FIRE_COOLDOWN: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ClosedFist,
    OpenPalm,
    Other,
}

impl Gesture {
    /// Map a recognizer's category label.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Closed_Fist" => Gesture::ClosedFist,
            "Open_Palm" => Gesture::OpenPalm,
            _ => Gesture::Other,
        }
    }
}

/// One best-effort recognizer result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureFrame {
    pub gesture: Gesture,
    /// Normalized `[0, 1]` camera coordinates, `None` when no hand is seen.
    pub hand: Option<(f32, f32)>,
}

impl GestureFrame {
    pub fn new(gesture: Gesture, x: f32, y: f32) -> Self {
        Self {
            gesture,
            hand: Some((x, y)),
        }
    }

    pub fn no_hand() -> Self {
        Self {
            gesture: Gesture::Other,
            hand: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeState {
    Idle,
    Charged { last_fist: Duration },
}

#[derive(Debug)]
pub struct GestureController {
    state: ChargeState,
    last_fire: Option<Duration>,
}

impl Default for GestureController {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureController {
    pub fn new() -> Self {
        Self {
            state: ChargeState::Idle,
            last_fire: None,
        }
    }

    pub fn state(&self) -> ChargeState {
        self.state
    }

    pub fn is_charged(&self) -> bool {
        matches!(self.state, ChargeState::Charged { .. })
    }

    pub fn reset(&mut self) {
        self.state = ChargeState::Idle;
        self.last_fire = None;
    }

    /// Feed one frame. Returns the trigger point in surface coordinates when
    /// the frame fires a shot.
    pub fn observe(
        &mut self,
        frame: GestureFrame,
        now: Duration,
        surface: (f32, f32),
    ) -> Option<(f32, f32)> {
        if let ChargeState::Charged { last_fist } = self.state {
            if now.saturating_sub(last_fist) >= CHARGE_TIMEOUT {
                self.state = ChargeState::Idle;
            }
        }

        let (hx, hy) = frame.hand?;
        match (frame.gesture, self.state) {
            (Gesture::ClosedFist, _) => {
                self.state = ChargeState::Charged { last_fist: now };
                None
            }
            (Gesture::OpenPalm, ChargeState::Charged { .. }) => {
                let cooled = self
                    .last_fire
                    .is_none_or(|fired| now.saturating_sub(fired) >= FIRE_COOLDOWN);
                if !cooled {
                    return None;
                }
                self.last_fire = Some(now);
                self.state = ChargeState::Idle;
                // camera image is mirrored
                Some(((1.0 - hx) * surface.0, hy * surface.1))
            }
            _ => None,
        }
    }
}
