use crate::utils::error::BillingError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 付款記錄上的月份標記 (YYYY-MM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, BillingError> {
        if !(1..=12).contains(&month) {
            return Err(BillingError::validation(format!(
                "Month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_ordinal(ordinal: i64) -> Option<Self> {
        let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
        let month = u32::try_from(ordinal.rem_euclid(12) + 1).ok()?;
        Some(Self { year, month })
    }

    pub fn add_months(self, months: i64) -> Option<Self> {
        Self::from_ordinal(self.ordinal().checked_add(months)?)
    }

    /// 正值表示 self 在 other 之後
    pub fn months_since(self, other: YearMonth) -> i64 {
        self.ordinal() - other.ordinal()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = BillingError;

    /// Accepts `YYYY-MM`, or a full `YYYY-MM-DD` date whose day is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BillingError::validation(format!("Invalid payment month: '{}'", s));

        let trimmed = s.trim();
        let mut parts = trimmed.splitn(3, '-');
        let year = parts
            .next()
            .filter(|p| p.len() == 4)
            .and_then(|p| p.parse::<i32>().ok())
            .ok_or_else(invalid)?;
        let month = parts
            .next()
            .filter(|p| p.len() == 2)
            .and_then(|p| p.parse::<u32>().ok())
            .ok_or_else(invalid)?;

        if parts.next().is_some() {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())?;
        }

        YearMonth::new(year, month)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = BillingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let ym: YearMonth = "2024-03".parse().unwrap();
        assert_eq!((ym.year(), ym.month()), (2024, 3));
        assert_eq!(ym.to_string(), "2024-03");

        let ym: YearMonth = "2024-03-01".parse().unwrap();
        assert_eq!(ym.to_string(), "2024-03");

        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("2024-3".parse::<YearMonth>().is_err());
        assert!("2024-02-30".parse::<YearMonth>().is_err());
        assert!("march".parse::<YearMonth>().is_err());
    }

    #[test]
    fn test_month_arithmetic_crosses_years() {
        let nov = YearMonth::new(2023, 11).unwrap();
        let feb = nov.add_months(3).unwrap();
        assert_eq!(feb, YearMonth::new(2024, 2).unwrap());
        assert_eq!(feb.months_since(nov), 3);
        assert_eq!(nov.months_since(feb), -3);
        assert_eq!(nov.add_months(-11).unwrap(), YearMonth::new(2022, 12).unwrap());
    }

    #[test]
    fn test_serde_as_string() {
        let ym = YearMonth::new(2025, 1).unwrap();
        let json = serde_json::to_string(&ym).unwrap();
        assert_eq!(json, "\"2025-01\"");
        let back: YearMonth = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ym);
    }
}
