use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

/// An ISO-8601 week (`year` is the ISO week-numbering year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct IsoWeek {
    pub year: i32,
    pub week: u32,
}

impl IsoWeek {
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        let w = date.iso_week();
        Self {
            year: w.year(),
            week: w.week(),
        }
    }

    /// Validates that the week exists in the given ISO year.
    pub fn new(year: i32, week: u32) -> Result<Self, String> {
        if NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_none() {
            return Err(format!("Invalid ISO week {week} for year {year}"));
        }
        Ok(Self { year, week })
    }

    /// The last full week before the one containing `today`.
    #[must_use]
    pub fn last_complete(today: NaiveDate) -> Self {
        Self::of(today - Duration::days(7))
    }

    #[must_use]
    pub fn last_complete_now() -> Self {
        Self::last_complete(Utc::now().date_naive())
    }

    #[must_use]
    pub fn monday(&self) -> NaiveDate {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon).unwrap_or_default()
    }

    #[must_use]
    pub fn sunday(&self) -> NaiveDate {
        self.monday() + Duration::days(6)
    }

    #[must_use]
    pub fn previous(&self) -> Self {
        Self::of(self.monday() - Duration::days(7))
    }

    /// The `count` complete weeks before `today`, most recent first.
    #[must_use]
    pub fn last_n(today: NaiveDate, count: u32) -> Vec<Self> {
        let mut out = Vec::with_capacity(count as usize);
        let mut current = Self::last_complete(today);
        for _ in 0..count {
            out.push(current);
            current = current.previous();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_complete_week_crosses_year_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let week = IsoWeek::last_complete(today);
        assert_eq!(week, IsoWeek { year: 2024, week: 52 });
    }

    #[test]
    fn last_n_is_contiguous() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let weeks = IsoWeek::last_n(today, 3);
        assert_eq!(
            weeks,
            vec![
                IsoWeek { year: 2025, week: 10 },
                IsoWeek { year: 2025, week: 9 },
                IsoWeek { year: 2025, week: 8 },
            ]
        );
        assert_eq!(weeks[0].monday(), NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
        assert_eq!(weeks[0].sunday(), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
    }

    #[test]
    fn rejects_missing_week() {
        assert!(IsoWeek::new(2025, 53).is_err());
        assert!(IsoWeek::new(2020, 53).is_ok());
    }
}
