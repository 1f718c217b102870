//! 门户 JSON → 领域记录
//!
//! 只做字段映射和格式换算，不发请求。

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{AppResult, PortalError};
use crate::models::portal_json::{
    first_text, text, ExamItem, GradeItem, PagedResponse, PlanCourseItem, PlanInfoItem,
    TimetableResponse,
};
use crate::models::{DegreeCourseIndex, ExamEntry, GradeDetail, GradeRecord, Term, TimetableEntry};

/// 周次位图能表示的最大周数
pub const MAX_WEEK: u32 = 64;

pub const EXAM_TIME_PENDING: &str = "时间待定";
pub const EXAM_ROOM_PENDING: &str = "地点待定";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeekParity {
    Every,
    Odd,
    Even,
}

impl WeekParity {
    fn accepts(self, week: u32) -> bool {
        match self {
            WeekParity::Every => true,
            WeekParity::Odd => week % 2 == 1,
            WeekParity::Even => week % 2 == 0,
        }
    }
}

/// 把周次描述解析为位图
///
/// 支持 "1-16周"、"3周"、"1-15周(单)"、"2-16周(双)" 以及逗号分隔的组合，
/// 第 `w` 周对应第 `w - 1` 位。无法解析的片段跳过。
pub fn parse_weeks_mask(text: &str) -> u64 {
    let normalized: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '（' => '(',
            '）' => ')',
            '，' => ',',
            other => other,
        })
        .collect();

    let mut mask = 0u64;
    for segment in normalized.split(',').filter(|s| !s.is_empty()) {
        let parity = if segment.contains('单') {
            WeekParity::Odd
        } else if segment.contains('双') {
            WeekParity::Even
        } else {
            WeekParity::Every
        };

        let range: String = segment
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '-')
            .collect();
        let bounds = match range.split_once('-') {
            Some((start, end)) => start.parse::<u32>().ok().zip(end.parse::<u32>().ok()),
            None => range.parse::<u32>().ok().map(|week| (week, week)),
        };
        let Some((start, end)) = bounds else {
            debug!("跳过无法解析的周次片段: {}", segment);
            continue;
        };

        for week in start.max(1)..=end.min(MAX_WEEK) {
            if parity.accepts(week) {
                mask |= 1u64 << (week - 1);
            }
        }
    }
    mask
}

/// 解析节次："3-4" → (3, 2)，"5" → (5, 1)，"3-4节" → (3, 2)
pub fn parse_periods(text: &str) -> Option<(u8, u8)> {
    let text: String = text
        .chars()
        .filter(|c| *c != '节' && !c.is_whitespace())
        .collect();
    match text.split_once('-') {
        Some((start, end)) => {
            let start: u8 = start.trim().parse().ok()?;
            let end: u8 = end.trim().parse().ok()?;
            (end >= start).then(|| (start, end - start + 1))
        }
        None => text.parse().ok().map(|start| (start, 1)),
    }
}

/// 解析星期：数字 "1".."7"，或者 "一".."六"、"日" / "天"，可以带 "星期" / "周" 前缀
pub fn parse_weekday(text: &str) -> Option<u8> {
    let text = text.trim();
    let text = text
        .strip_prefix("星期")
        .or_else(|| text.strip_prefix('周'))
        .unwrap_or(text);
    let day = match text {
        "一" => 1,
        "二" => 2,
        "三" => 3,
        "四" => 4,
        "五" => 5,
        "六" => 6,
        "日" | "天" => 7,
        digits => digits.parse().ok()?,
    };
    (1..=7).contains(&day).then_some(day)
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|e| PortalError::decode(what, e))
}

fn is_yes(value: &Option<String>) -> bool {
    matches!(text(value).as_str(), "是" | "1")
}

/// 课表响应 → 课表条目
///
/// # 参数
/// - `body`: 响应正文
/// - `term`: 查询的学期，条目缺少学年学期字段时使用
pub fn timetable_from_json(body: &str, term: Term) -> AppResult<Vec<TimetableEntry>> {
    let response: TimetableResponse = decode(body, "课表")?;

    let entries = response
        .kb_list
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| {
            let course_name = text(&item.kcmc);
            if course_name.is_empty() {
                return None;
            }
            let (period_start, period_count) = parse_periods(&text(&item.jcs)).unwrap_or_else(|| {
                warn!("⚠️ 无法解析节次: {} ({:?})", course_name, item.jcs);
                (0, 0)
            });
            let weeks_text = text(&item.zcd);
            let course_id = first_text(&[&item.kch_id]);

            Some(TimetableEntry {
                course_id: if course_id.is_empty() { course_name.clone() } else { course_id },
                weekday: parse_weekday(&text(&item.xqj)).unwrap_or(0),
                period_start,
                period_count,
                weeks_mask: parse_weeks_mask(&weeks_text),
                weeks_text,
                room: text(&item.cdmc),
                instructor: text(&item.xm),
                term: Term::from_codes(&text(&item.xnm), &text(&item.xqm)).unwrap_or(term),
                course_name,
            })
        })
        .collect();
    Ok(entries)
}

/// 成绩响应 → 成绩记录（不含明细）
///
/// # 参数
/// - `body`: 响应正文
/// - `term`: 查询的学期
/// - `student_id`: 响应缺少学号时使用的学号
pub fn grades_from_json(body: &str, term: Term, student_id: &str) -> AppResult<Vec<GradeRecord>> {
    let response: PagedResponse<GradeItem> = decode(body, "成绩")?;

    let records = response
        .into_items()
        .into_iter()
        .filter_map(|item| {
            let course_name = text(&item.kcmc);
            if course_name.is_empty() {
                return None;
            }
            let course_id = first_text(&[&item.kch_id, &item.kch]);
            let xh = text(&item.xh);

            Some(GradeRecord {
                student_id: if xh.is_empty() { student_id.to_string() } else { xh },
                term: Term::from_codes(&text(&item.xnm), &text(&item.xqm)).unwrap_or(term),
                course_id: if course_id.is_empty() { course_name.clone() } else { course_id },
                raw_score: text(&item.cj),
                credit: text(&item.xf),
                gpa_point: text(&item.jd),
                exam_nature: text(&item.ksxz),
                is_degree_course: is_yes(&item.sfxwkc),
                course_type: text(&item.kcxzmc),
                assessment: text(&item.khfsmc),
                instructor: text(&item.jsxm),
                class_id: text(&item.jxb_id),
                detail: GradeDetail::default(),
                course_name,
            })
        })
        .collect();
    Ok(records)
}

/// 考试响应 → 考试安排
pub fn exams_from_json(body: &str) -> AppResult<Vec<ExamEntry>> {
    let response: PagedResponse<ExamItem> = decode(body, "考试")?;

    let exams = response
        .into_items()
        .into_iter()
        .filter_map(|item| {
            let course_name = text(&item.kcmc);
            if course_name.is_empty() {
                return None;
            }
            let time = text(&item.kssj);
            let room = text(&item.cdmc);

            Some(ExamEntry {
                course_name,
                exam_time_raw: if time.is_empty() { EXAM_TIME_PENDING.to_string() } else { time },
                room: if room.is_empty() { EXAM_ROOM_PENDING.to_string() } else { room },
                campus: text(&item.cdxqmc),
                seat_number: first_text(&[&item.zwh, &item.zw]),
            })
        })
        .collect();
    Ok(exams)
}

/// 培养方案查询响应 → 方案 id
pub fn plan_id_from_json(body: &str) -> AppResult<Option<String>> {
    let response: PagedResponse<PlanInfoItem> = decode(body, "培养方案")?;
    Ok(response
        .into_items()
        .iter()
        .map(|item| text(&item.jxzxjhxx_id))
        .find(|id| !id.is_empty()))
}

/// 培养方案课程响应 → 学位课索引
pub fn degree_index_from_json(body: &str) -> AppResult<DegreeCourseIndex> {
    let response: PagedResponse<PlanCourseItem> = decode(body, "培养方案课程")?;

    let mut index = DegreeCourseIndex::new();
    for item in response.into_items() {
        let is_degree = is_yes(&item.sfxwkc) || is_yes(&item.xwkc);
        index.insert(
            &first_text(&[&item.kch_id, &item.kch]),
            &text(&item.kcmc),
            is_degree,
        );
    }
    Ok(index)
}
