use chrono::{Duration, NaiveDateTime};
use crate::config::BookingPolicy;
use crate::domain::models::slot::{BusyInterval, Slot, TimeWindow};

#[derive(Debug, Clone, Copy)]
pub struct SlotRules {
    pub step_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub min_lead_minutes: i64,
}

impl Default for SlotRules {
    fn default() -> Self {
        SlotRules::from(&BookingPolicy::default())
    }
}

impl From<&BookingPolicy> for SlotRules {
    fn from(policy: &BookingPolicy) -> Self {
        Self {
            step_minutes: policy.step_minutes,
            buffer_before_minutes: policy.buffer_before_minutes,
            buffer_after_minutes: policy.buffer_after_minutes,
            min_lead_minutes: policy.min_lead_minutes,
        }
    }
}

/// Walks the fixed `step` grid from `window.start` and keeps every candidate
/// `[start, start + duration)` that fits the window, starts no earlier than
/// `now + min_lead` and overlaps no buffer-expanded busy interval.
///
/// `busy` need not be sorted or disjoint. All times are local wall-clock.
pub fn generate_slots(
    window: &TimeWindow,
    duration_minutes: i64,
    busy: &[BusyInterval],
    rules: &SlotRules,
    now: NaiveDateTime,
) -> Vec<Slot> {
    if duration_minutes <= 0 || rules.step_minutes <= 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(duration_minutes);
    if window.end - window.start < duration {
        return Vec::new();
    }

    let before = Duration::minutes(rules.buffer_before_minutes.max(0));
    let after = Duration::minutes(rules.buffer_after_minutes.max(0));
    let blocked: Vec<(NaiveDateTime, NaiveDateTime)> = busy
        .iter()
        .filter(|b| b.start < b.end)
        .map(|b| (b.start - before, b.end + after))
        .collect();

    let earliest = now + Duration::minutes(rules.min_lead_minutes.max(0));
    let step = Duration::minutes(rules.step_minutes);

    let mut slots = Vec::new();
    let mut cursor = window.start;
    while cursor + duration <= window.end {
        let end = cursor + duration;
        let is_free = blocked.iter().all(|(b_start, b_end)| end <= *b_start || cursor >= *b_end);

        if cursor >= earliest && is_free {
            slots.push(Slot { start: cursor, end });
        }
        cursor += step;
    }

    slots
}
