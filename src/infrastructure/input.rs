//! Gamepad input sources
//!
//! The game loop polls an [`InputSource`] once per tick. Real hardware reads
//! two analog axes and an active-low button mask; the sources here stand in
//! for it in tests and in the two-device demo.

use crate::domain::controller::StickConfig;
use crate::domain::models::{Axis, Coordinate, InputSample};
use crate::infrastructure::bluetooth::PeerLink;
use std::collections::VecDeque;
use tokio::sync::watch;

pub trait InputSource: Send {
    /// One-time hardware setup
    fn begin(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    fn read_axis(&mut self, axis: Axis) -> i32;

    /// Active-low button bitmask
    fn read_buttons(&mut self) -> u32;

    fn sample(&mut self) -> InputSample {
        InputSample {
            axis_x: self.read_axis(Axis::X),
            axis_y: self.read_axis(Axis::Y),
            buttons: self.read_buttons(),
        }
    }
}

/// Plays back fixed samples, then holds the stick centered
#[derive(Debug, Default)]
pub struct ScriptedInput {
    queue: VecDeque<InputSample>,
    current: InputSample,
}

impl ScriptedInput {
    pub fn new(samples: impl IntoIterator<Item = InputSample>) -> Self {
        Self {
            queue: samples.into_iter().collect(),
            current: InputSample::default(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn read_axis(&mut self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.current.axis_x,
            Axis::Y => self.current.axis_y,
        }
    }

    fn read_buttons(&mut self) -> u32 {
        self.current.buttons
    }

    fn sample(&mut self) -> InputSample {
        self.current = self.queue.pop_front().unwrap_or_default();
        self.current
    }
}

/// Pushes the stick toward the peer's last known position.
///
/// `position` follows this device's own dot; while the peer is unreachable
/// the stick rests centered.
pub struct ChaseStick<L> {
    stick: StickConfig,
    session: L,
    position: watch::Receiver<Coordinate>,
    /// Stick offset per pixel of distance
    gain: i32,
}

impl<L: PeerLink> ChaseStick<L> {
    pub fn new(stick: StickConfig, session: L, position: watch::Receiver<Coordinate>) -> Self {
        Self {
            stick,
            session,
            position,
            gain: 24,
        }
    }

    fn deflection(&self, axis: Axis) -> i32 {
        if !self.session.is_reachable() {
            return self.stick.center;
        }
        let target = self.session.remote_coordinate().axis(axis);
        let here = self.position.borrow().axis(axis);
        let reach = self.stick.center - 1;
        let mut delta = target
            .saturating_sub(here)
            .saturating_mul(self.gain)
            .clamp(-reach, reach);
        if axis == Axis::Y && self.stick.invert_y {
            delta = -delta;
        }
        self.stick.center + delta
    }
}

impl<L: PeerLink> InputSource for ChaseStick<L> {
    fn read_axis(&mut self, axis: Axis) -> i32 {
        self.deflection(axis)
    }

    fn read_buttons(&mut self) -> u32 {
        u32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::controller::{Acceleration, StickProcessor, BUTTON_START};
    use crate::domain::models::SessionState;
    use std::time::Duration;

    #[test]
    fn test_scripted_input_falls_back_to_centered() {
        let moved = InputSample {
            axis_x: 1000,
            axis_y: 20,
            buttons: !(1 << BUTTON_START),
        };
        let mut input = ScriptedInput::new([moved]);

        assert_eq!(input.sample(), moved);
        assert_eq!(input.read_axis(Axis::X), 1000);
        assert_eq!(input.sample(), InputSample::default());
        assert_eq!(input.read_buttons(), u32::MAX);
    }

    struct FixedPeer {
        state: SessionState,
        remote: Coordinate,
    }

    impl PeerLink for FixedPeer {
        fn state(&self) -> SessionState {
            self.state
        }

        fn remote_coordinate(&self) -> Coordinate {
            self.remote
        }

        fn send_local_update(&self, _coord: Coordinate) {}
    }

    #[test]
    fn test_chase_steers_toward_peer() {
        let stick = StickConfig::default();
        let (_tx, position) = watch::channel(Coordinate::new(100, 100));
        let peer = FixedPeer {
            state: SessionState::Connected,
            remote: Coordinate::new(300, 105),
        };
        let mut chase = ChaseStick::new(stick, peer, position);

        let sample = chase.sample();
        assert_eq!(sample.axis_x, 1023);
        // peer is lower on screen, so with inverted Y the stick is pulled down
        assert_eq!(sample.axis_y, 512 - 5 * 24);
        assert_eq!(sample.buttons, u32::MAX);

        let processor = StickProcessor::new(stick, Duration::from_millis(500));
        let step = processor.displacement(&sample, Acceleration::default());
        assert!(step.x > 0 && step.y >= 0);
    }

    #[test]
    fn test_chase_saturates_on_extreme_peer() {
        let (_tx, position) = watch::channel(Coordinate::new(10, 10));
        let peer = FixedPeer {
            state: SessionState::Connected,
            remote: Coordinate::new(i32::MIN, i32::MAX),
        };
        let mut chase = ChaseStick::new(StickConfig::default(), peer, position);

        let sample = chase.sample();
        assert_eq!(sample.axis_x, 1);
        assert_eq!(sample.axis_y, 1);
    }

    #[test]
    fn test_chase_rests_while_unreachable() {
        let (_tx, position) = watch::channel(Coordinate::new(100, 100));
        let peer = FixedPeer {
            state: SessionState::Scanning,
            remote: Coordinate::new(300, 300),
        };
        let mut chase = ChaseStick::new(StickConfig::default(), peer, position);
        assert_eq!(chase.sample(), InputSample::default());
    }
}
