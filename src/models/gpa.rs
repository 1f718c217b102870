use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::grade::GradeRecord;

/// 分数到绩点的换算表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GpaScale {
    /// 学校现行规则：95 分以上 4.5，60 分起每 5 分加 0.5
    #[default]
    HalfStep,
    /// 常见的 4.0 分档表
    Standard,
}

impl GpaScale {
    /// 分档下界包含在本档内
    pub fn point(self, score: f64) -> f64 {
        match self {
            GpaScale::HalfStep => {
                if score >= 95.0 {
                    4.5
                } else if score < 60.0 {
                    0.0
                } else {
                    1.0 + ((score - 60.0) / 5.0).floor() * 0.5
                }
            }
            GpaScale::Standard => {
                const BANDS: [(f64, f64); 9] = [
                    (90.0, 4.0),
                    (85.0, 3.7),
                    (82.0, 3.3),
                    (78.0, 3.0),
                    (75.0, 2.7),
                    (72.0, 2.3),
                    (68.0, 2.0),
                    (64.0, 1.5),
                    (60.0, 1.0),
                ];
                BANDS
                    .iter()
                    .find(|(lower, _)| score >= *lower)
                    .map_or(0.0, |(_, point)| *point)
            }
        }
    }
}

/// 四舍五入（远离零）后按固定小数位输出，不截掉末尾的 0
pub fn format_fixed(value: f64, decimals: usize) -> String {
    let factor = 10f64.powi(decimals as i32);
    // 补偿 x.xx5 这类值在二进制下略小于真实值的情况
    let scaled = value * factor;
    let rounded = (scaled + scaled.signum() * 1e-9).round() / factor;
    format!("{:.*}", decimals, rounded)
}

fn format_score(score: f64) -> String {
    if score.fract().abs() < 1e-9 {
        format!("{:.0}", score)
    } else {
        format_fixed(score, 1)
    }
}

/// 参与绩点计算的课程，外加一层可修改的模拟分数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpaCourse {
    pub record: GradeRecord,
    pub is_degree_course: bool,
    /// 由原始成绩解析出的分数（等级制、合格制已换算）
    pub base_score: Option<f64>,
    /// 合格 / 通过 / 免修 这类只记通过的课程
    pub is_pass_only: bool,
    pub simulated_score: Option<f64>,
    pub scale: GpaScale,
}

impl GpaCourse {
    /// 学分，无法解析或非正数按 0 计
    pub fn credit(&self) -> f64 {
        self.record
            .credit
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or(0.0)
    }

    /// 参与排序和绩点换算的分数
    pub fn score_value(&self) -> Option<f64> {
        self.simulated_score.or(self.base_score)
    }

    /// 绩点：模拟分数 → 门户绩点 → 按分数换算
    pub fn gpa_value(&self) -> f64 {
        if let Some(score) = self.simulated_score {
            return self.scale.point(score);
        }
        if let Some(point) = self
            .record
            .gpa_point
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
        {
            return point;
        }
        self.scale.point(self.base_score.unwrap_or(0.0))
    }

    pub fn display_score(&self) -> String {
        if let Some(score) = self.simulated_score {
            return format_score(score);
        }
        match self.record.numeric_score() {
            Some(score) => format_score(score),
            None => self.record.raw_score.clone(),
        }
    }

    pub fn display_gpa(&self) -> String {
        format_fixed(self.gpa_value(), 2)
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated_score.is_some()
    }
}

/// 绩点统计结果，每次汇总重新计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpaStats {
    pub total_gpa: String,
    pub total_credits: String,
    pub degree_gpa: String,
    pub degree_credits: String,
}

impl Default for GpaStats {
    fn default() -> Self {
        Self {
            total_gpa: "0.00".to_string(),
            total_credits: "0.0".to_string(),
            degree_gpa: "0.00".to_string(),
            degree_credits: "0.0".to_string(),
        }
    }
}

/// 课程筛选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseFilter {
    #[default]
    All,
    DegreeOnly,
}

/// 按分数排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
}

/// 汇总结果：统计值基于全部课程，`courses` 是筛选排序后的视图
#[derive(Debug, Clone, PartialEq)]
pub struct GpaReport {
    pub stats: GpaStats,
    pub courses: Vec<GpaCourse>,
}

/// 培养方案中的学位课索引，按课程号和课程名双键查找
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegreeCourseIndex {
    flags: HashMap<String, bool>,
}

impl DegreeCourseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, course_id: &str, course_name: &str, is_degree: bool) {
        for key in [course_id.trim(), course_name.trim()] {
            if !key.is_empty() {
                self.flags.insert(key.to_string(), is_degree);
            }
        }
    }

    /// 先按课程号查，查不到再按课程名
    pub fn lookup(&self, course_id: &str, course_name: &str) -> Option<bool> {
        self.flags
            .get(course_id.trim())
            .or_else(|| self.flags.get(course_name.trim()))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_step_scale() {
        let scale = GpaScale::HalfStep;
        assert_eq!(scale.point(100.0), 4.5);
        assert_eq!(scale.point(95.0), 4.5);
        assert_eq!(scale.point(94.0), 4.0);
        assert_eq!(scale.point(90.0), 4.0);
        assert_eq!(scale.point(85.0), 3.5);
        assert_eq!(scale.point(64.9), 1.0);
        assert_eq!(scale.point(60.0), 1.0);
        assert_eq!(scale.point(59.9), 0.0);
    }

    #[test]
    fn test_standard_scale_bounds_inclusive() {
        let scale = GpaScale::Standard;
        assert_eq!(scale.point(90.0), 4.0);
        assert_eq!(scale.point(89.9), 3.7);
        assert_eq!(scale.point(85.0), 3.7);
        assert_eq!(scale.point(60.0), 1.0);
        assert_eq!(scale.point(0.0), 0.0);
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(2.8, 2), "2.80");
        assert_eq!(format_fixed(0.0, 1), "0.0");
        assert_eq!(format_fixed(3.125, 2), "3.13");
        assert_eq!(format_fixed(3.144, 2), "3.14");
        assert_eq!(format_fixed(-1.25, 1), "-1.3");
    }

    #[test]
    fn test_degree_index_lookup() {
        let mut index = DegreeCourseIndex::new();
        index.insert("C001", "高等数学", true);
        index.insert("", "体育", false);

        assert_eq!(index.lookup("C001", "别名"), Some(true));
        assert_eq!(index.lookup("X", "高等数学"), Some(true));
        assert_eq!(index.lookup("X", "体育"), Some(false));
        assert_eq!(index.lookup("X", "线性代数"), None);
        assert_eq!(index.len(), 3);
    }
}
