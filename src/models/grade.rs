use serde::{Deserialize, Serialize};

use super::term::Term;

/// 成绩构成明细（平时 / 实验 / 期末）
///
/// 比例是门户原样的百分比字符串，未出现的项为空串。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeDetail {
    pub regular_score: String,
    pub regular_ratio: String,
    pub experiment_score: String,
    pub experiment_ratio: String,
    pub final_score: String,
    pub final_ratio: String,
}

impl GradeDetail {
    pub fn is_empty(&self) -> bool {
        *self == GradeDetail::default()
    }

    /// 三项比例都存在且是数字时返回其和，否则 `None`
    pub fn ratio_sum(&self) -> Option<f64> {
        let parse = |ratio: &str| ratio.trim().trim_end_matches('%').trim().parse::<f64>().ok();
        Some(
            parse(&self.regular_ratio)?
                + parse(&self.experiment_ratio)?
                + parse(&self.final_ratio)?,
        )
    }
}

/// 单门课程的成绩记录
///
/// 抽取后不再修改；模拟分数放在 `GpaCourse` 上。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub student_id: String,
    pub term: Term,
    pub course_id: String,
    pub course_name: String,
    /// 门户原始成绩，可能是数字，也可能是 "优"、"合格" 之类
    pub raw_score: String,
    pub credit: String,
    /// 门户给出的绩点
    pub gpa_point: String,
    /// 考试性质，如 "正常考试"、"补考"
    pub exam_nature: String,
    pub is_degree_course: bool,
    /// 课程性质，如 "必修"
    pub course_type: String,
    /// 考核方式
    pub assessment: String,
    pub instructor: String,
    /// 教学班 id，查询成绩明细时需要
    pub class_id: String,
    pub detail: GradeDetail,
}

impl GradeRecord {
    pub fn with_detail(mut self, detail: GradeDetail) -> Self {
        self.detail = detail;
        self
    }

    /// 数值形式的原始成绩
    pub fn numeric_score(&self) -> Option<f64> {
        self.raw_score.trim().parse().ok()
    }
}
