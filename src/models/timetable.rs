use serde::{Deserialize, Serialize};

use super::term::Term;

/// 课表条目
///
/// `weeks_mask` 的第 `w - 1` 位为 1 当且仅当该课程在第 `w` 周上课。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub course_id: String,
    pub course_name: String,
    /// 星期几，1-7
    pub weekday: u8,
    /// 第几节开始
    pub period_start: u8,
    /// 连续节数
    pub period_count: u8,
    pub weeks_mask: u64,
    /// 门户原始的周次描述，如 "1-16周(单)"
    pub weeks_text: String,
    pub room: String,
    pub instructor: String,
    pub term: Term,
}

impl TimetableEntry {
    /// 是否在第 `week` 周上课
    pub fn meets_on_week(&self, week: u32) -> bool {
        (1..=64).contains(&week) && self.weeks_mask & (1u64 << (week - 1)) != 0
    }

    /// 上课的所有周次，升序
    pub fn weeks(&self) -> Vec<u32> {
        (1..=64).filter(|w| self.meets_on_week(*w)).collect()
    }

    /// 结束节次（含）
    pub fn period_end(&self) -> u8 {
        self.period_start + self.period_count.saturating_sub(1)
    }
}
