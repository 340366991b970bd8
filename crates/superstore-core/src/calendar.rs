use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

/// Calendar bucket used to resample dated rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Period {
    Month,
    Quarter,
}

impl Period {
    /// Last day of the period containing `date`.
    pub fn end_of(&self, date: NaiveDate) -> Option<NaiveDate> {
        let last_month = match self {
            Period::Month => date.month(),
            Period::Quarter => (date.month() - 1) / 3 * 3 + 3,
        };
        last_day_of_month(date.year(), last_month)
    }

    /// End of the period following the one that ends on `period_end`.
    pub fn next_end(&self, period_end: NaiveDate) -> Option<NaiveDate> {
        let following = period_end.succ_opt()?;
        self.end_of(following)
    }

    /// Consecutive period ends from `first` through `last`, both inclusive.
    pub fn range(&self, first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
        let mut ends = Vec::new();
        let Some(stop) = self.end_of(last) else {
            return ends;
        };
        let mut current = self.end_of(first);
        while let Some(end) = current {
            if end > stop {
                break;
            }
            ends.push(end);
            current = self.next_end(end);
        }
        ends
    }

    /// Number (1-12) of the closing month of the period each date falls in.
    pub fn closing_month(&self, dates: Expr) -> Expr {
        match self {
            Period::Month => dates.dt().month().cast(DataType::Int32),
            Period::Quarter => dates.dt().quarter().cast(DataType::Int32) * lit(3),
        }
    }

    pub fn label(&self, period_end: NaiveDate) -> String {
        match self {
            Period::Month => period_end.format("%Y-%m").to_string(),
            Period::Quarter => format!("{}-Q{}", period_end.year(), period_end.month().div_ceil(3)),
        }
    }
}

pub(crate) fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
