//! Held-key tracking for continuous jogging.
//!
//! Terminals report key presses and auto-repeats, and only some report
//! releases. A key therefore counts as held until it is released or
//! until the hold window passes without another press or repeat.
//! Each tick yields at most one intent per axis.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::model::{Axis, JogIntent};

#[derive(Debug)]
pub struct HoldTracker {
    hold: Duration,
    /// Last press time and press number per held intent.
    last_seen: HashMap<JogIntent, (Instant, u64)>,
    presses: u64,
}

impl HoldTracker {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            last_seen: HashMap::new(),
            presses: 0,
        }
    }

    /// Records a press or auto-repeat.
    pub fn press(&mut self, intent: JogIntent, now: Instant) {
        self.presses += 1;
        self.last_seen.insert(intent, (now, self.presses));
    }

    pub fn release(&mut self, intent: JogIntent) {
        self.last_seen.remove(&intent);
    }

    pub fn clear(&mut self) {
        self.last_seen.clear();
    }

    /// The intents to apply this tick, in axis order.
    ///
    /// When both directions of an axis are held, the most recent wins.
    /// Presses with the same timestamp are ordered by arrival.
    pub fn tick(&mut self, now: Instant) -> Vec<JogIntent> {
        let hold = self.hold;
        self.last_seen
            .retain(|_, (seen, _)| now.saturating_duration_since(*seen) <= hold);

        Axis::ALL
            .into_iter()
            .filter_map(|axis| {
                self.last_seen
                    .iter()
                    .filter(|(intent, _)| intent.axis == axis)
                    .max_by_key(|(_, pressed)| **pressed)
                    .map(|(intent, _)| *intent)
            })
            .collect()
    }
}

/// Fixed-period deadlines that do not drift when a tick runs late.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next: start + period,
        }
    }

    /// Time left until the next tick is due.
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Returns true and schedules the following tick if one is due.
    /// Missed ticks are skipped rather than replayed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            self.next += self.period;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_millis(600);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn single_press_repeats_within_hold_window() {
        let t0 = Instant::now();
        let mut tracker = HoldTracker::new(HOLD);
        tracker.press(JogIntent::increase(Axis::Theta), t0);

        assert_eq!(tracker.tick(t0 + ms(200)), [JogIntent::increase(Axis::Theta)]);
        assert_eq!(tracker.tick(t0 + ms(400)), [JogIntent::increase(Axis::Theta)]);
        assert!(tracker.tick(t0 + ms(800)).is_empty());
        assert!(tracker.last_seen.is_empty());
    }

    #[test]
    fn repeats_extend_the_hold() {
        let t0 = Instant::now();
        let mut tracker = HoldTracker::new(HOLD);
        let intent = JogIntent::decrease(Axis::Phi);
        tracker.press(intent, t0);
        tracker.press(intent, t0 + ms(500));

        assert_eq!(tracker.tick(t0 + ms(1000)), [intent]);
    }

    #[test]
    fn release_stops_immediately() {
        let t0 = Instant::now();
        let mut tracker = HoldTracker::new(HOLD);
        let intent = JogIntent::increase(Axis::H);
        tracker.press(intent, t0);
        tracker.release(intent);

        assert!(tracker.tick(t0 + ms(10)).is_empty());
    }

    #[test]
    fn two_axes_yield_two_intents_in_axis_order() {
        let t0 = Instant::now();
        let mut tracker = HoldTracker::new(HOLD);
        tracker.press(JogIntent::increase(Axis::H), t0);
        tracker.press(JogIntent::decrease(Axis::Theta), t0);

        assert_eq!(
            tracker.tick(t0 + ms(200)),
            [
                JogIntent::decrease(Axis::Theta),
                JogIntent::increase(Axis::H)
            ]
        );
    }

    #[test]
    fn opposite_directions_latest_wins() {
        let t0 = Instant::now();
        let mut tracker = HoldTracker::new(HOLD);
        tracker.press(JogIntent::increase(Axis::Phi), t0);
        tracker.press(JogIntent::decrease(Axis::Phi), t0 + ms(50));

        assert_eq!(tracker.tick(t0 + ms(100)), [JogIntent::decrease(Axis::Phi)]);
    }

    #[test]
    fn same_instant_presses_resolve_by_arrival() {
        let t0 = Instant::now();
        let up = JogIntent::increase(Axis::Theta);
        let down = JogIntent::decrease(Axis::Theta);

        let mut tracker = HoldTracker::new(HOLD);
        tracker.press(up, t0);
        tracker.press(down, t0);
        for i in 1..=5 {
            assert_eq!(tracker.tick(t0 + ms(i * 10)), [down]);
        }

        let mut tracker = HoldTracker::new(HOLD);
        tracker.press(down, t0);
        tracker.press(up, t0);
        assert_eq!(tracker.tick(t0 + ms(10)), [up]);
    }

    #[test]
    fn ticker_fires_once_per_period() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(ms(200), t0);

        assert!(!ticker.poll(t0 + ms(100)));
        assert_eq!(ticker.until_next(t0 + ms(100)), ms(100));
        assert!(ticker.poll(t0 + ms(200)));
        assert!(!ticker.poll(t0 + ms(250)));
    }

    #[test]
    fn ticker_skips_missed_ticks() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(ms(200), t0);

        assert!(ticker.poll(t0 + ms(1000)));
        assert!(!ticker.poll(t0 + ms(1100)));
        assert!(ticker.poll(t0 + ms(1200)));
    }
}
