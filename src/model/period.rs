use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Returns `None` unless `end > start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (end > start).then_some(Self { start, end })
    }

    /// For rows whose table already enforces `end > start`.
    pub fn new_unchecked(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days().max(0)
    }

    pub fn intersection(&self, other: &DateRange) -> Option<DateRange> {
        self.overlaps(other).then(|| DateRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    /// Human-readable inclusive form, e.g. `2026-03-02 to 2026-03-04`.
    pub fn display_text(&self) -> String {
        let last = self.end - Duration::days(1);
        if last <= self.start {
            self.start.to_string()
        } else {
            format!("{} to {}", self.start, last)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted_ranges() {
        assert!(DateRange::new(d(2026, 3, 2), d(2026, 3, 2)).is_none());
        assert!(DateRange::new(d(2026, 3, 3), d(2026, 3, 2)).is_none());
        assert!(DateRange::new(d(2026, 3, 2), d(2026, 3, 3)).is_some());
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        let a = DateRange::new(d(2026, 3, 2), d(2026, 3, 4)).unwrap();
        let b = DateRange::new(d(2026, 3, 4), d(2026, 3, 6)).unwrap();
        let c = DateRange::new(d(2026, 3, 3), d(2026, 3, 5)).unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn dates_excludes_end() {
        let r = DateRange::new(d(2026, 3, 2), d(2026, 3, 5)).unwrap();
        let days: Vec<_> = r.dates().collect();
        assert_eq!(days, vec![d(2026, 3, 2), d(2026, 3, 3), d(2026, 3, 4)]);
        assert_eq!(r.display_text(), "2026-03-02 to 2026-03-04");
    }
}
