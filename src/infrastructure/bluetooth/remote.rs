//! Remote Coordinate Store
//!
//! Written from the transport's delivery thread, read from the game loop.
//! Each axis is its own atomic, so a torn read mixes at most two individually
//! valid axis values.

use crate::domain::models::{Axis, Coordinate};
use crate::infrastructure::bluetooth::protocol::{decode_axis, decode_pair};
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::{trace, warn};

#[derive(Debug, Default)]
pub struct RemoteCoordinate {
    x: AtomicI32,
    y: AtomicI32,
}

impl RemoteCoordinate {
    pub fn new(initial: Coordinate) -> Self {
        Self {
            x: AtomicI32::new(initial.x),
            y: AtomicI32::new(initial.y),
        }
    }

    pub fn get(&self) -> Coordinate {
        Coordinate::new(self.x.load(Ordering::Acquire), self.y.load(Ordering::Acquire))
    }

    pub fn store(&self, coord: Coordinate) {
        self.x.store(coord.x, Ordering::Release);
        self.y.store(coord.y, Ordering::Release);
    }

    fn slot(&self, axis: Axis) -> &AtomicI32 {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    /// Decode a single-axis payload. An undecodable payload leaves the axis as it was.
    pub fn apply_axis(&self, axis: Axis, payload: &[u8]) -> bool {
        match decode_axis(payload) {
            Ok(value) => {
                self.slot(axis).store(value, Ordering::Release);
                trace!("Remote {:?} = {}", axis, value);
                true
            }
            Err(e) => {
                warn!("Dropping remote {:?} update: {}", axis, e);
                false
            }
        }
    }

    /// Decode an `"x,y"` payload. Each axis that decodes is applied.
    pub fn apply_pair(&self, payload: &[u8]) -> bool {
        let (x, y) = decode_pair(payload);
        let mut applied = false;
        for (axis, result) in [(Axis::X, x), (Axis::Y, y)] {
            match result {
                Ok(value) => {
                    self.slot(axis).store(value, Ordering::Release);
                    applied = true;
                }
                Err(e) => warn!("Dropping remote {:?} update: {}", axis, e),
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_starts_at_origin() {
        assert_eq!(RemoteCoordinate::default().get(), Coordinate::ORIGIN);
    }

    #[test]
    fn test_malformed_payload_keeps_last_value() {
        let remote = RemoteCoordinate::new(Coordinate::new(40, 50));

        assert!(remote.apply_axis(Axis::X, b"87,stray"));
        assert!(!remote.apply_axis(Axis::Y, b"junk"));
        assert_eq!(remote.get(), Coordinate::new(87, 50));

        assert!(remote.apply_pair(b"12,oops"));
        assert_eq!(remote.get(), Coordinate::new(12, 50));
        assert!(!remote.apply_pair(b"nothing"));
        assert_eq!(remote.get(), Coordinate::new(12, 50));
    }

    #[test]
    fn test_concurrent_writers_leave_valid_axes() {
        let remote = Arc::new(RemoteCoordinate::default());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let remote = remote.clone();
                std::thread::spawn(move || {
                    for n in 0..500 {
                        let value = i * 1000 + n;
                        remote.apply_pair(format!("{},{}", value, value).as_bytes());
                    }
                })
            })
            .collect();

        for _ in 0..500 {
            let seen = remote.get();
            assert!((0..4000).contains(&seen.x));
            assert!((0..4000).contains(&seen.y));
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }
}
