use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 学期
///
/// 门户用 `xqm` 表示：3 为第一学期，12 为第二学期，16 为小学期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Semester {
    First,
    Second,
    Summer,
}

impl Semester {
    /// 门户的学期代码
    pub fn code(self) -> &'static str {
        match self {
            Semester::First => "3",
            Semester::Second => "12",
            Semester::Summer => "16",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "3" => Some(Semester::First),
            "12" => Some(Semester::Second),
            "16" => Some(Semester::Summer),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Semester::First => "第1学期",
            Semester::Second => "第2学期",
            Semester::Summer => "小学期",
        }
    }
}

/// 学年 + 学期
///
/// `year` 是学年的起始年份，2024 表示 2024-2025 学年。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    pub year: i32,
    pub semester: Semester,
}

impl Term {
    pub fn new(year: i32, semester: Semester) -> Self {
        Self { year, semester }
    }

    /// 由门户字段 `xnm` / `xqm` 构造
    pub fn from_codes(year: &str, semester: &str) -> Option<Self> {
        let year = year.trim().parse().ok()?;
        Some(Self::new(year, Semester::from_code(semester)?))
    }

    /// 门户的学年参数 `xnm`
    pub fn year_code(&self) -> String {
        self.year.to_string()
    }

    /// 门户的学期参数 `xqm`
    pub fn semester_code(&self) -> &'static str {
        self.semester.code()
    }

    /// 给定日期所在的学期
    ///
    /// 8-12 月为当年第一学期，1 月仍属上一学年第一学期，2-7 月为上一学年第二学期。
    pub fn current(date: NaiveDate) -> Self {
        match date.month() {
            8..=12 => Self::new(date.year(), Semester::First),
            1 => Self::new(date.year() - 1, Semester::First),
            _ => Self::new(date.year() - 1, Semester::Second),
        }
    }

    pub fn current_local() -> Self {
        Self::current(chrono::Local::now().date_naive())
    }

    /// `first_year..=last_year` 每个学年的第一、第二学期，按时间顺序
    pub fn span(first_year: i32, last_year: i32) -> Vec<Term> {
        (first_year..=last_year)
            .flat_map(|year| {
                [
                    Term::new(year, Semester::First),
                    Term::new(year, Semester::Second),
                ]
            })
            .collect()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} {}", self.year, self.year + 1, self.semester.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_term() {
        assert_eq!(Term::current(date(2024, 9, 1)), Term::new(2024, Semester::First));
        assert_eq!(Term::current(date(2025, 1, 15)), Term::new(2024, Semester::First));
        assert_eq!(Term::current(date(2025, 3, 1)), Term::new(2024, Semester::Second));
        assert_eq!(Term::current(date(2025, 7, 31)), Term::new(2024, Semester::Second));
        assert_eq!(Term::current(date(2025, 8, 1)), Term::new(2025, Semester::First));
    }

    #[test]
    fn test_codes() {
        let term = Term::from_codes("2023", "12").unwrap();
        assert_eq!(term, Term::new(2023, Semester::Second));
        assert_eq!(term.year_code(), "2023");
        assert_eq!(term.semester_code(), "12");
        assert!(Term::from_codes("2023", "7").is_none());
        assert!(Term::from_codes("", "3").is_none());
    }

    #[test]
    fn test_span_and_order() {
        let terms = Term::span(2022, 2023);
        assert_eq!(terms.len(), 4);
        assert_eq!(terms[0], Term::new(2022, Semester::First));
        assert_eq!(terms[3], Term::new(2023, Semester::Second));
        assert!(terms.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Term::new(2024, Semester::First).to_string(), "2024-2025 第1学期");
    }
}
