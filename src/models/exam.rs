use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 考试安排
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamEntry {
    pub course_name: String,
    /// 门户原始时间串，如 "2026-01-08(09:30-11:30)"
    pub exam_time_raw: String,
    pub room: String,
    pub campus: String,
    pub seat_number: String,
}

impl ExamEntry {
    /// 解析 `(` 之前的日期部分，格式不符时返回 `None`
    pub fn exam_date(&self) -> Option<NaiveDate> {
        let date_part = self.exam_time_raw.split('(').next()?.trim();
        NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
    }

    /// 距离 `today` 还有几天，已经考过为负数
    pub fn days_until(&self, today: NaiveDate) -> Option<i64> {
        self.exam_date().map(|date| (date - today).num_days())
    }

    /// 用于展示的地点，有校区时附在教室后面
    pub fn location_label(&self) -> String {
        if self.campus.is_empty() {
            self.room.clone()
        } else {
            format!("{}({})", self.room, self.campus)
        }
    }
}
