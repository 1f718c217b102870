//! 绩点统计
//!
//! 纯计算，不发请求。统计值每次从课程列表重新算出，不做增量更新。

use phf::phf_map;
use tracing::debug;

use crate::models::gpa::format_fixed;
use crate::models::{
    CourseFilter, DegreeCourseIndex, GpaCourse, GpaReport, GpaScale, GpaStats, GradeRecord,
    SortOrder,
};

/// 等级制成绩对应的分数
static GRADE_LEVEL_SCORES: phf::Map<&'static str, f64> = phf_map! {
    "优" => 95.0,
    "优秀" => 95.0,
    "A" => 95.0,
    "良" => 85.0,
    "良好" => 85.0,
    "B" => 85.0,
    "中" => 75.0,
    "中等" => 75.0,
    "C" => 75.0,
    "及格" => 65.0,
    "D" => 65.0,
    "不及格" => 0.0,
    "F" => 0.0,
};

/// 把原始成绩文本解析为分数：数字原样，等级制按对照表
pub fn parse_score_text(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(score) = raw.parse::<f64>() {
        return score.is_finite().then_some(score);
    }
    GRADE_LEVEL_SCORES.get(raw).copied()
}

/// 绩点计算规则
#[derive(Debug, Clone, PartialEq)]
pub struct GpaRules {
    pub scale: GpaScale,
    /// 只记通过的成绩标记
    pub pass_markers: Vec<String>,
    /// 通过类成绩折算的分数
    pub pass_score: f64,
    /// 不参与绩点计算的成绩标记
    pub excluded_markers: Vec<String>,
    /// 重修课程只保留最高分
    pub dedupe_retakes: bool,
}

impl Default for GpaRules {
    fn default() -> Self {
        Self {
            scale: GpaScale::HalfStep,
            pass_markers: vec!["合格".into(), "通过".into(), "免修".into()],
            pass_score: 60.0,
            excluded_markers: vec!["缓考".into()],
            dedupe_retakes: true,
        }
    }
}

/// 绩点引擎
///
/// 职责：
/// - 把成绩记录包装成可模拟的课程
/// - 汇总全部课程和学位课的加权绩点
/// - 提供筛选和排序视图
#[derive(Debug, Clone, Default)]
pub struct GpaEngine {
    rules: GpaRules,
}

impl GpaEngine {
    pub fn new(rules: GpaRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GpaRules {
        &self.rules
    }

    /// 成绩记录 → 参与计算的课程
    ///
    /// # 参数
    /// - `records`: 所有学期的成绩
    /// - `degree_index`: 培养方案中的学位课索引，优先于成绩里的学位课标记
    ///
    /// # 返回
    /// 去掉缓考、合并重修后按学期排序的课程列表
    pub fn prepare(
        &self,
        records: &[GradeRecord],
        degree_index: Option<&DegreeCourseIndex>,
    ) -> Vec<GpaCourse> {
        let mut courses: Vec<GpaCourse> = Vec::with_capacity(records.len());

        for record in records {
            if self.is_excluded(record) {
                debug!("跳过缓考课程: {}", record.course_name);
                continue;
            }

            let course = self.wrap(record, degree_index);
            if self.rules.dedupe_retakes {
                if let Some(existing) = courses
                    .iter_mut()
                    .find(|c| c.record.course_name == course.record.course_name)
                {
                    if score_key(&course) > score_key(existing) {
                        *existing = course;
                    }
                    continue;
                }
            }
            courses.push(course);
        }

        courses.sort_by_key(|c| c.record.term);
        courses
    }

    fn is_excluded(&self, record: &GradeRecord) -> bool {
        self.rules.excluded_markers.iter().any(|marker| {
            record.raw_score.contains(marker.as_str()) || record.exam_nature.contains(marker.as_str())
        })
    }

    fn wrap(&self, record: &GradeRecord, degree_index: Option<&DegreeCourseIndex>) -> GpaCourse {
        let raw = record.raw_score.trim();
        let is_pass_only = self.rules.pass_markers.iter().any(|m| m == raw);
        let base_score = if is_pass_only {
            Some(self.rules.pass_score)
        } else {
            parse_score_text(raw)
        };
        let is_degree_course = degree_index
            .and_then(|index| index.lookup(&record.course_id, &record.course_name))
            .unwrap_or(record.is_degree_course);

        GpaCourse {
            record: record.clone(),
            is_degree_course,
            base_score,
            is_pass_only,
            simulated_score: None,
            scale: self.rules.scale,
        }
    }

    /// 汇总：统计值基于全部课程，课程视图按 `filter` 筛选、按 `sort` 排序
    pub fn aggregate(&self, courses: &[GpaCourse], filter: CourseFilter, sort: SortOrder) -> GpaReport {
        GpaReport {
            stats: compute_stats(courses),
            courses: sort_courses(filter_courses(courses, filter), sort),
        }
    }
}

fn score_key(course: &GpaCourse) -> f64 {
    course.score_value().unwrap_or(f64::NEG_INFINITY)
}

/// 学分加权平均绩点，学分为 0 的课程不参与
pub fn compute_stats(courses: &[GpaCourse]) -> GpaStats {
    let (total_points, total_credits) = weighted_sum(courses.iter());
    let (degree_points, degree_credits) = weighted_sum(courses.iter().filter(|c| c.is_degree_course));

    GpaStats {
        total_gpa: format_fixed(average(total_points, total_credits), 2),
        total_credits: format_fixed(total_credits, 1),
        degree_gpa: format_fixed(average(degree_points, degree_credits), 2),
        degree_credits: format_fixed(degree_credits, 1),
    }
}

fn weighted_sum<'a>(courses: impl Iterator<Item = &'a GpaCourse>) -> (f64, f64) {
    courses
        .map(|c| (c.credit(), c.gpa_value()))
        .filter(|(credit, _)| *credit > 0.0)
        .fold((0.0, 0.0), |(points, credits), (credit, point)| {
            (points + point * credit, credits + credit)
        })
}

fn average(points: f64, credits: f64) -> f64 {
    if credits > 0.0 {
        points / credits
    } else {
        0.0
    }
}

/// 按学位课筛选，保持原顺序
pub fn filter_courses(courses: &[GpaCourse], filter: CourseFilter) -> Vec<GpaCourse> {
    courses
        .iter()
        .filter(|c| match filter {
            CourseFilter::All => true,
            CourseFilter::DegreeOnly => c.is_degree_course,
        })
        .cloned()
        .collect()
}

/// 按分数稳定排序，没有分数的课程视为最低
pub fn sort_courses(mut courses: Vec<GpaCourse>, order: SortOrder) -> Vec<GpaCourse> {
    courses.sort_by(|a, b| {
        let ordering = score_key(a).total_cmp(&score_key(b));
        match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });
    courses
}

/// 设置模拟分数
///
/// # 返回
/// 找到对应课程返回 `true`
pub fn simulate(courses: &mut [GpaCourse], course_id: &str, score: f64) -> bool {
    match courses.iter_mut().find(|c| c.record.course_id == course_id) {
        Some(course) => {
            course.simulated_score = Some(score.clamp(0.0, 100.0));
            true
        }
        None => false,
    }
}

/// 清除所有模拟分数
pub fn reset_simulation(courses: &mut [GpaCourse]) {
    for course in courses.iter_mut() {
        course.simulated_score = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GradeDetail, Semester, Term};

    fn record(id: &str, name: &str, score: &str, credit: &str, degree: bool) -> GradeRecord {
        GradeRecord {
            student_id: "2021001".into(),
            term: Term::new(2023, Semester::First),
            course_id: id.into(),
            course_name: name.into(),
            raw_score: score.into(),
            credit: credit.into(),
            gpa_point: String::new(),
            exam_nature: "正常考试".into(),
            is_degree_course: degree,
            course_type: String::new(),
            assessment: String::new(),
            instructor: String::new(),
            class_id: String::new(),
            detail: GradeDetail::default(),
        }
    }

    fn courses(records: &[GradeRecord]) -> Vec<GpaCourse> {
        GpaEngine::default().prepare(records, None)
    }

    #[test]
    fn test_weighted_average_two_courses() {
        let list = courses(&[
            record("K1", "数据结构", "90", "3.0", true),
            record("K2", "体育", "60", "2.0", false),
        ]);
        let stats = compute_stats(&list);

        assert_eq!(stats.total_gpa, "2.80");
        assert_eq!(stats.total_credits, "5.0");
        assert_eq!(stats.degree_gpa, "4.00");
        assert_eq!(stats.degree_credits, "3.0");
    }

    #[test]
    fn test_empty_list() {
        let stats = compute_stats(&[]);
        assert_eq!(stats, GpaStats::default());
        assert_eq!(stats.total_gpa, "0.00");
        assert_eq!(stats.total_credits, "0.0");
        assert_eq!(stats.degree_gpa, "0.00");
        assert_eq!(stats.degree_credits, "0.0");
    }

    #[test]
    fn test_unparsable_credit_contributes_nothing() {
        let list = courses(&[
            record("K1", "数据结构", "90", "3", false),
            record("K2", "讲座", "50", "", false),
            record("K3", "劳动", "40", "abc", false),
        ]);
        let stats = compute_stats(&list);
        assert_eq!(stats.total_gpa, "4.00");
        assert_eq!(stats.total_credits, "3.0");
    }

    #[test]
    fn test_point_priority() {
        let mut with_jd = record("K1", "数据结构", "90", "2", false);
        with_jd.gpa_point = "3.70".into();
        let mut list = courses(&[with_jd]);

        assert_eq!(list[0].display_gpa(), "3.70");
        assert!(simulate(&mut list, "K1", 60.0));
        assert_eq!(list[0].display_gpa(), "1.00");
        assert_eq!(list[0].display_score(), "60");

        reset_simulation(&mut list);
        assert_eq!(list[0].display_gpa(), "3.70");
        assert_eq!(list[0].display_score(), "90");
    }

    #[test]
    fn test_grade_levels_and_pass_only() {
        let list = courses(&[
            record("K1", "英语", "良", "2", false),
            record("K2", "军训", "合格", "1", false),
            record("K3", "选修", "不及格", "1", false),
        ]);

        assert_eq!(list[0].base_score, Some(85.0));
        assert_eq!(list[0].display_score(), "良");
        assert!(list[1].is_pass_only);
        assert_eq!(list[1].base_score, Some(60.0));
        assert_eq!(list[1].display_score(), "合格");
        assert_eq!(list[1].display_gpa(), "1.00");
        assert_eq!(list[2].base_score, Some(0.0));
    }

    #[test]
    fn test_parse_score_text() {
        assert_eq!(parse_score_text(" 88.5 "), Some(88.5));
        assert_eq!(parse_score_text("优"), Some(95.0));
        assert_eq!(parse_score_text("及格"), Some(65.0));
        assert_eq!(parse_score_text("不及格"), Some(0.0));
        assert_eq!(parse_score_text("缺考"), None);
        assert_eq!(parse_score_text("NaN"), None);
    }

    #[test]
    fn test_deferred_excluded_and_retake_dedupe() {
        let mut retake = record("K1", "高等数学", "75", "4", true);
        retake.term = Term::new(2024, Semester::First);
        retake.exam_nature = "重修".into();

        let list = courses(&[
            record("K1", "高等数学", "55", "4", true),
            record("K9", "大学物理", "缓考", "3", false),
            retake,
        ]);

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].base_score, Some(75.0));
        assert_eq!(list[0].record.term, Term::new(2024, Semester::First));
    }

    #[test]
    fn test_degree_index_overrides_flag() {
        let mut index = DegreeCourseIndex::new();
        index.insert("K2", "线性代数", true);
        index.insert("K1", "数据结构", false);

        let list = GpaEngine::default().prepare(
            &[
                record("K1", "数据结构", "90", "3", true),
                record("K2", "线性代数", "80", "2", false),
                record("K3", "体育", "70", "1", true),
            ],
            Some(&index),
        );

        let flags: Vec<bool> = list.iter().map(|c| c.is_degree_course).collect();
        assert_eq!(flags, vec![false, true, true]);
    }

    #[test]
    fn test_simulate_unknown_course() {
        let mut list = courses(&[record("K1", "数据结构", "90", "3", true)]);
        assert!(!simulate(&mut list, "NOPE", 100.0));
        assert!(simulate(&mut list, "K1", 150.0));
        assert_eq!(list[0].simulated_score, Some(100.0));
    }

    #[test]
    fn test_aggregate_stats_cover_all_courses() {
        let engine = GpaEngine::default();
        let list = courses(&[
            record("K1", "数据结构", "90", "3.0", true),
            record("K2", "体育", "60", "2.0", false),
        ]);
        let report = engine.aggregate(&list, CourseFilter::DegreeOnly, SortOrder::Ascending);

        assert_eq!(report.stats.total_gpa, "2.80");
        assert_eq!(report.courses.len(), 1);
        assert_eq!(report.courses[0].record.course_id, "K1");
    }

    #[test]
    fn test_filter_and_sort_commute() {
        let scores = ["90", "60", "缺考", "75", "90", "合格", "88", "60"];
        let records: Vec<GradeRecord> = scores
            .iter()
            .enumerate()
            .map(|(i, score)| {
                record(&format!("K{}", i), &format!("课程{}", i), score, "2", i % 3 != 1)
            })
            .collect();
        let list = courses(&records);

        for filter in [CourseFilter::All, CourseFilter::DegreeOnly] {
            for order in [SortOrder::Ascending, SortOrder::Descending] {
                let sort_then_filter = filter_courses(&sort_courses(list.clone(), order), filter);
                let filter_then_sort = sort_courses(filter_courses(&list, filter), order);
                assert_eq!(sort_then_filter, filter_then_sort, "{:?} {:?}", filter, order);

                // 再次应用结果不变
                let again = sort_courses(filter_courses(&filter_then_sort, filter), order);
                assert_eq!(again, filter_then_sort);
            }
        }
    }
}
