//! Gamepad Processing
//!
//! Turns raw analog stick readings and the button bitmask into dot movement,
//! speed changes and warp requests.

use crate::domain::models::{Coordinate, InputSample};
use std::time::{Duration, Instant};

/// Select button bit in the gamepad bitmask (cycles speed)
pub const BUTTON_SELECT: u32 = 0;
/// Start button bit in the gamepad bitmask (warps the dot)
pub const BUTTON_START: u32 = 16;

/// Buttons read low while pressed
pub fn is_pressed(buttons: u32, bit: u32) -> bool {
    buttons & (1 << bit) == 0
}

/// Step multiplier cycling through 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceleration(u8);

impl Acceleration {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn get(self) -> i32 {
        self.0 as i32
    }

    pub fn next(self) -> Self {
        if self.0 >= Self::MAX {
            Self(Self::MIN)
        } else {
            Self(self.0 + 1)
        }
    }
}

impl Default for Acceleration {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

/// Lets a held button fire once per hold-off window.
///
/// A press that outlasts the window fires again, same as the device firmware
/// that slept for a fixed delay after each action.
#[derive(Debug, Clone)]
pub struct HoldOff {
    window: Duration,
    last_fired: Option<Instant>,
}

impl HoldOff {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    pub fn trigger(&mut self, pressed: bool, now: Instant) -> bool {
        if !pressed {
            return false;
        }
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StickConfig {
    pub center: i32,
    pub dead_zone: i32,
    pub base_speed: i32,
    pub invert_y: bool,
}

impl Default for StickConfig {
    fn default() -> Self {
        Self {
            center: 512,
            dead_zone: 10,
            base_speed: 2,
            invert_y: true,
        }
    }
}

/// Signed movement for one axis. Readings inside the dead zone do not move.
pub fn axis_step(reading: i32, center: i32, dead_zone: i32, multiplier: i32) -> i32 {
    let offset = reading - center;
    if offset.abs() <= dead_zone || center == 0 {
        return 0;
    }
    (offset as f64 / center as f64 * multiplier as f64) as i32
}

/// What the buttons asked for on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonActions {
    pub cycle_speed: bool,
    pub warp: bool,
}

pub struct StickProcessor {
    config: StickConfig,
    speed_latch: HoldOff,
    warp_latch: HoldOff,
}

impl StickProcessor {
    pub fn new(config: StickConfig, holdoff: Duration) -> Self {
        Self {
            config,
            speed_latch: HoldOff::new(holdoff),
            warp_latch: HoldOff::new(holdoff),
        }
    }

    /// Unclamped displacement for this sample. X and Y are independent.
    pub fn displacement(&self, sample: &InputSample, acceleration: Acceleration) -> Coordinate {
        let multiplier = self.config.base_speed * acceleration.get();
        let dx = axis_step(
            sample.axis_x,
            self.config.center,
            self.config.dead_zone,
            multiplier,
        );
        let dy = axis_step(
            sample.axis_y,
            self.config.center,
            self.config.dead_zone,
            multiplier,
        );
        Coordinate::new(dx, if self.config.invert_y { -dy } else { dy })
    }

    pub fn buttons(&mut self, sample: &InputSample, now: Instant) -> ButtonActions {
        ButtonActions {
            cycle_speed: self
                .speed_latch
                .trigger(is_pressed(sample.buttons, BUTTON_SELECT), now),
            warp: self
                .warp_latch
                .trigger(is_pressed(sample.buttons, BUTTON_START), now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: i32, y: i32) -> InputSample {
        InputSample {
            axis_x: x,
            axis_y: y,
            ..Default::default()
        }
    }

    #[test]
    fn test_dead_zone() {
        assert_eq!(axis_step(512, 512, 10, 8), 0);
        assert_eq!(axis_step(522, 512, 10, 8), 0);
        assert_eq!(axis_step(502, 512, 10, 8), 0);
        assert_eq!(axis_step(1023, 512, 10, 8), 7);
        assert_eq!(axis_step(0, 512, 10, 8), -8);
    }

    #[test]
    fn test_diagonal_and_inverted_y() {
        let processor = StickProcessor::new(StickConfig::default(), Duration::from_millis(500));
        let step = processor.displacement(&sample(1023, 1023), Acceleration::default());
        assert_eq!(step, Coordinate::new(1, -1));

        let step = processor.displacement(&sample(0, 0), Acceleration::default().next());
        assert_eq!(step, Coordinate::new(-4, 4));

        let step = processor.displacement(&sample(1023, 515), Acceleration::default());
        assert_eq!(step, Coordinate::new(1, 0));
    }

    #[test]
    fn test_acceleration_wraps() {
        let mut accel = Acceleration::default();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(accel.get());
            accel = accel.next();
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 1]);
    }

    #[test]
    fn test_active_low_buttons() {
        let all_released = u32::MAX;
        assert!(!is_pressed(all_released, BUTTON_SELECT));
        assert!(is_pressed(all_released & !(1 << BUTTON_START), BUTTON_START));
        assert!(!is_pressed(all_released & !(1 << BUTTON_START), BUTTON_SELECT));
    }

    #[test]
    fn test_holdoff_window() {
        let mut latch = HoldOff::new(Duration::from_millis(500));
        let t0 = Instant::now();

        assert!(!latch.trigger(false, t0));
        assert!(latch.trigger(true, t0));
        assert!(!latch.trigger(true, t0 + Duration::from_millis(100)));
        assert!(!latch.trigger(true, t0 + Duration::from_millis(499)));
        // still held past the window: fires again
        assert!(latch.trigger(true, t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_buttons_fire_independently() {
        let mut processor =
            StickProcessor::new(StickConfig::default(), Duration::from_millis(500));
        let now = Instant::now();
        let both = InputSample {
            buttons: !(1 << BUTTON_SELECT) & !(1 << BUTTON_START),
            ..Default::default()
        };

        let actions = processor.buttons(&both, now);
        assert_eq!(actions, ButtonActions { cycle_speed: true, warp: true });
        let actions = processor.buttons(&both, now + Duration::from_millis(10));
        assert_eq!(actions, ButtonActions::default());
    }
}
