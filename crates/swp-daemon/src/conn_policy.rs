//! Per-connection rate and duplicate-suppression policy.
//!
//! Each connection worker owns one [`ConnPolicy`]; the state is never shared
//! across connections. Time is passed in by the caller so tests can drive
//! the windows deterministically.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Width of the frame-rate window.
pub const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Maximum frames accepted within one rate window.
pub const MAX_FRAMES_PER_WINDOW: u32 = 128;

/// How long a msg-id stays hot for duplicate detection.
pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(5);

/// Policy violations; the connection worker closes the socket on either.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    /// More than [`MAX_FRAMES_PER_WINDOW`] frames inside one rate window.
    #[error("rate limit exceeded: {count} frames in window")]
    RateLimitExceeded {
        /// Frames counted in the current window, including the offender.
        count: u32,
    },

    /// msg_id already seen within [`DUPLICATE_WINDOW`].
    #[error("duplicate in-flight msg_id")]
    DuplicateMsgId,
}

/// Sliding-window frame counter plus a time-indexed duplicate set.
#[derive(Debug)]
pub struct ConnPolicy {
    window_start: Instant,
    frame_count: u32,
    rate_window: Duration,
    max_frames: u32,
    duplicate_window: Duration,
    seen_msg_ids: HashMap<Vec<u8>, Instant>,
}

impl ConnPolicy {
    /// Creates policy state anchored at `now` with the default windows.
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frame_count: 0,
            rate_window: RATE_WINDOW,
            max_frames: MAX_FRAMES_PER_WINDOW,
            duplicate_window: DUPLICATE_WINDOW,
            seen_msg_ids: HashMap::new(),
        }
    }

    /// Custom windows, for tests.
    #[must_use]
    pub fn with_windows(
        now: Instant,
        rate_window: Duration,
        max_frames: u32,
        duplicate_window: Duration,
    ) -> Self {
        Self {
            window_start: now,
            frame_count: 0,
            rate_window,
            max_frames,
            duplicate_window,
            seen_msg_ids: HashMap::new(),
        }
    }

    /// Admits one frame arriving at `now` with the given msg_id.
    ///
    /// # Errors
    ///
    /// [`PolicyViolation::RateLimitExceeded`] when the frame count passes
    /// the window limit; [`PolicyViolation::DuplicateMsgId`] when the
    /// msg_id was seen within the duplicate window. On a rate violation the
    /// msg_id is not recorded.
    pub fn check(&mut self, now: Instant, msg_id: &[u8]) -> Result<(), PolicyViolation> {
        if now.duration_since(self.window_start) >= self.rate_window {
            self.window_start = now;
            self.frame_count = 0;
        }
        self.frame_count += 1;
        if self.frame_count > self.max_frames {
            return Err(PolicyViolation::RateLimitExceeded {
                count: self.frame_count,
            });
        }

        // Evict entries that have aged out of the duplicate window.
        let window = self.duplicate_window;
        self.seen_msg_ids
            .retain(|_, seen_at| now.duration_since(*seen_at) < window);

        if self.seen_msg_ids.contains_key(msg_id) {
            return Err(PolicyViolation::DuplicateMsgId);
        }
        self.seen_msg_ids.insert(msg_id.to_vec(), now);
        Ok(())
    }
}
