use serde::{Deserialize, Serialize};

/// Position of a dot on the display, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    /// Value reported for the peer until its first update arrives
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance between two dots
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    pub fn axis(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// Inclusive drawable region of the display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    /// Region that keeps a dot of `margin` radius fully on screen.
    ///
    /// A screen too small for the margin collapses to a single row or column.
    pub fn inset(width: i32, height: i32, margin: i32) -> Self {
        Self {
            min_x: margin,
            max_x: width.saturating_sub(margin).max(margin),
            min_y: margin,
            max_y: height.saturating_sub(margin).max(margin),
        }
    }

    /// Every addressable pixel, `[0, width) x [0, height)`
    pub fn full(width: i32, height: i32) -> Self {
        Self {
            min_x: 0,
            max_x: width.saturating_sub(1).max(0),
            min_y: 0,
            max_y: height.saturating_sub(1).max(0),
        }
    }

    /// Saturate a coordinate into the region
    pub fn clamp(&self, coord: Coordinate) -> Coordinate {
        Coordinate {
            x: coord.x.clamp(self.min_x, self.max_x),
            y: coord.y.clamp(self.min_y, self.max_y),
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.min_x..=self.max_x).contains(&coord.x)
            && (self.min_y..=self.max_y).contains(&coord.y)
    }
}

/// Connection lifecycle of the single session a device runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Scanning = 1,
    Connecting = 2,
    Connected = 3,
    Disconnected = 4,
}

impl SessionState {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Scanning,
            2 => Self::Connecting,
            3 => Self::Connected,
            4 => Self::Disconnected,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Playing,
    Ended,
}

/// Which side of the GATT model a device plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Advertises the service and hosts the attributes
    Publisher,
    /// Scans for the publisher, subscribes and writes
    Subscriber,
}

/// How coordinates are laid out across attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeLayout {
    /// One read/write/notify attribute carrying `"x,y"`
    Combined,
    /// Readable X/Y (publisher to subscriber) plus writable X/Y (subscriber to publisher)
    Split,
}

impl AttributeLayout {
    pub fn bounds(&self, width: i32, height: i32) -> Bounds {
        match self {
            Self::Combined => Bounds::inset(width, height, 5),
            Self::Split => Bounds::full(width, height),
        }
    }
}

/// What a device advertises and what its peer filters on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerIdentity {
    pub service_uuid: String,
    pub name: String,
}

/// One poll of the gamepad
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSample {
    pub axis_x: i32,
    pub axis_y: i32,
    /// Active-low button bitmask
    pub buttons: u32,
}

impl Default for InputSample {
    fn default() -> Self {
        Self {
            axis_x: 512,
            axis_y: 512,
            buttons: u32::MAX,
        }
    }
}

/// Full-screen background behind status text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBackground {
    Cyan,
    Blue,
    Green,
    Orange,
    Red,
    Magenta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub background: StatusBackground,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_saturates_and_is_idempotent() {
        let bounds = Bounds::inset(320, 240, 5);
        let samples = [
            Coordinate::new(-40, 10),
            Coordinate::new(400, 500),
            Coordinate::new(160, -1),
            Coordinate::new(i32::MAX, i32::MIN),
            Coordinate::new(100, 100),
        ];

        for coord in samples {
            let once = bounds.clamp(coord);
            assert!(bounds.contains(once), "{} escaped bounds", once);
            assert_eq!(bounds.clamp(once), once);
        }
        assert_eq!(bounds.clamp(Coordinate::new(400, -3)), Coordinate::new(315, 5));
    }

    #[test]
    fn test_layout_bounds() {
        assert_eq!(
            AttributeLayout::Combined.bounds(320, 240),
            Bounds {
                min_x: 5,
                max_x: 315,
                min_y: 5,
                max_y: 235
            }
        );
        assert_eq!(
            AttributeLayout::Split.bounds(320, 240),
            Bounds {
                min_x: 0,
                max_x: 319,
                min_y: 0,
                max_y: 239
            }
        );
    }

    #[test]
    fn test_distance() {
        let a = Coordinate::new(10, 10);
        let b = Coordinate::new(10, 35);
        assert_eq!(a.distance_to(&b), 25.0);
        assert_eq!(Coordinate::new(0, 0).distance_to(&Coordinate::new(3, 4)), 5.0);
    }

    #[test]
    fn test_distance_at_axis_extremes() {
        let here = Coordinate::new(10, 10);
        let far = Coordinate::new(i32::MIN, i32::MAX);

        let d = here.distance_to(&far);
        assert!(d.is_finite());
        assert!(d > 2_147_483_000.0);
        assert_eq!(far.distance_to(&here), d);
        assert_eq!(
            Coordinate::new(i32::MAX, 0).distance_to(&Coordinate::new(i32::MIN, 0)),
            u32::MAX as f64
        );
    }

    #[test]
    fn test_tiny_screen_bounds_stay_ordered() {
        for bounds in [
            Bounds::inset(8, 4, 5),
            Bounds::inset(0, 0, 5),
            Bounds::full(0, -3),
        ] {
            assert!(bounds.min_x <= bounds.max_x);
            assert!(bounds.min_y <= bounds.max_y);
            let clamped = bounds.clamp(Coordinate::new(100, -100));
            assert!(bounds.contains(clamped));
        }
        assert_eq!(Bounds::inset(8, 240, 5).clamp(Coordinate::new(7, 7)).x, 5);
    }

    #[test]
    fn test_session_state_u8() {
        for state in [
            SessionState::Idle,
            SessionState::Scanning,
            SessionState::Connecting,
            SessionState::Connected,
            SessionState::Disconnected,
        ] {
            assert_eq!(SessionState::from_u8(state.as_u8()), state);
        }
        assert_eq!(SessionState::from_u8(200), SessionState::Idle);
    }
}
