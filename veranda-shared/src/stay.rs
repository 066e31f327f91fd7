use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stay as a half-open date interval: nights [check_in, check_out).
/// The check-out date itself is not occupied, so back-to-back stays may
/// share a turnover day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Self {
        Self { check_in, check_out }
    }

    /// Number of nights covered. Negative when the range is inverted;
    /// callers validate before trusting this.
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    pub fn is_valid(&self) -> bool {
        self.check_out > self.check_in
    }

    /// True when the date falls on an occupied night.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.check_in && date < self.check_out
    }

    /// Half-open overlap: two stays conflict only if they share a night.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    /// Iterate every occupied night in order.
    pub fn nights_iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.check_in
            .iter_days()
            .take_while(move |d| *d < self.check_out)
    }
}

impl std::fmt::Display for StayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.check_in, self.check_out)
    }
}

/// Party composition for a stay. Infants do not count toward capacity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GuestCount {
    pub adults: u32,
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
    #[serde(default)]
    pub pets: u32,
}

impl GuestCount {
    /// Guests counted against property capacity.
    pub fn counted(&self) -> u32 {
        self.adults + self.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_nights_and_validity() {
        let stay = StayRange::new(d("2025-07-01"), d("2025-07-04"));
        assert_eq!(stay.nights(), 3);
        assert!(stay.is_valid());

        let inverted = StayRange::new(d("2025-07-04"), d("2025-07-01"));
        assert!(!inverted.is_valid());
    }

    #[test]
    fn test_half_open_overlap() {
        let a = StayRange::new(d("2025-07-01"), d("2025-07-05"));
        let b = StayRange::new(d("2025-07-05"), d("2025-07-08"));
        let c = StayRange::new(d("2025-07-04"), d("2025-07-06"));

        // Back-to-back stays share a turnover day, not a night
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&b));
    }

    #[test]
    fn test_contains_excludes_checkout_day() {
        let stay = StayRange::new(d("2025-07-01"), d("2025-07-03"));
        assert!(stay.contains(d("2025-07-01")));
        assert!(stay.contains(d("2025-07-02")));
        assert!(!stay.contains(d("2025-07-03")));
    }

    #[test]
    fn test_nights_iter() {
        let stay = StayRange::new(d("2025-07-01"), d("2025-07-04"));
        let nights: Vec<NaiveDate> = stay.nights_iter().collect();
        assert_eq!(nights, vec![d("2025-07-01"), d("2025-07-02"), d("2025-07-03")]);
    }
}
