// SPDX-FileCopyrightText: 2026 Relaypost Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The elapsed-time gate.
//!
//! The engine is polled on a short fixed period but only performs work when
//! the configured interval has elapsed since the last completed run. The
//! gate is state-based, not edge-triggered, so the polling period can change
//! freely without double-firing.

use relaypost_core::Settings;

/// Whether a distribution run is due at `now` (unix seconds).
pub fn is_due(settings: &Settings, now: i64) -> bool {
    let required = (settings.interval_hours * 3600.0) as i64;
    now - settings.last_run_at >= required
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(last_run_at: i64, interval_hours: f64) -> Settings {
        Settings {
            interval_hours,
            last_run_at,
            ..Settings::default()
        }
    }

    #[test]
    fn not_due_one_hour_into_a_daily_interval() {
        assert!(!is_due(&settings(1_000_000, 24.0), 1_000_000 + 3_600));
    }

    #[test]
    fn due_one_second_past_the_interval() {
        assert!(is_due(&settings(1_000_000, 24.0), 1_000_000 + 86_400 + 1));
    }

    #[test]
    fn due_exactly_at_the_interval() {
        assert!(is_due(&settings(1_000_000, 24.0), 1_000_000 + 86_400));
    }

    #[test]
    fn fractional_hours_are_honored() {
        let s = settings(0, 0.5);
        assert!(!is_due(&s, 1_799));
        assert!(is_due(&s, 1_800));
    }

    #[test]
    fn fresh_install_is_due_immediately() {
        // last_run_at seeds to 0, so the first poll always fires.
        assert!(is_due(&Settings::default(), 1_700_000_000));
    }
}
