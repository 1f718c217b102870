//! HTML 片段抽取
//!
//! 通知列表按三种页面结构依次尝试，第一个有结果的策略胜出，不跨策略合并。
//! CSRF 令牌和校历日期不在稳定的 DOM 结构里，用正则匹配。

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::GradeDetail;

/// 通知抽取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeStrategy {
    /// 调课通知：`#kbDiv` 下的列表项标题
    CourseUpdate,
    /// 停补课通知：`#home` 下的时间 + `data-tkxx`
    Reschedule,
    /// 考试通知：`#exam` 下的标题 + 详情
    ExamNotice,
}

/// 通知抽取结果，`strategy` 为 `None` 表示所有策略都没有命中
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoticeExtraction {
    pub strategy: Option<NoticeStrategy>,
    pub notices: Vec<String>,
}

impl NoticeExtraction {
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

/// 考试通知里标题和详情之间的分隔符
pub const EXAM_NOTICE_SEPARATOR: &str = "###";

const EXAM_NOTICE_BOILERPLATE: &str = "考试安排";

const CSRF_PATTERNS: [&str; 4] = [
    r#"<input\s+type="hidden"\s+id="csrftoken"\s+name="csrftoken"\s+value="([^"]+)"\s*/?>"#,
    r#"name="csrftoken"\s+value="([^"]+)""#,
    r#"id="csrftoken".*?value="([^"]+)""#,
    r#"value="([^"]+)"[^>]*?name="csrftoken""#,
];

/// 从登录页提取 CSRF 令牌，依次尝试四种写法
pub fn extract_csrf_token(html: &str) -> Option<String> {
    CSRF_PATTERNS.iter().enumerate().find_map(|(index, pattern)| {
        let re = Regex::new(pattern).ok()?;
        let token = re.captures(html)?.get(1)?.as_str().trim();
        if token.is_empty() {
            return None;
        }
        debug!("CSRF 令牌由第 {} 种写法匹配", index + 1);
        Some(token.to_string())
    })
}

/// 从校历片段中提取开学日期：第一个后面跟着"至"的 `YYYY-MM-DD`
pub fn extract_semester_start(html: &str) -> Option<NaiveDate> {
    let re = Regex::new(r"(\d{4}-\d{2}-\d{2})\s*至").ok()?;
    let date = re.captures(html)?.get(1)?.as_str();
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// 抽取通知列表
///
/// # 参数
/// - `html`: 门户首页区块片段
///
/// # 返回
/// 命中的策略和通知文本；全部未命中时返回空结果而不是错误
pub fn extract_notices(html: &str) -> NoticeExtraction {
    let document = Html::parse_document(html);

    let strategies: [(NoticeStrategy, fn(&Html) -> Vec<String>); 3] = [
        (NoticeStrategy::CourseUpdate, course_update_notices),
        (NoticeStrategy::Reschedule, reschedule_notices),
        (NoticeStrategy::ExamNotice, exam_notices),
    ];

    for (strategy, extract) in strategies {
        let notices = extract(&document);
        if !notices.is_empty() {
            debug!("✓ 通知策略 {:?} 命中 {} 条", strategy, notices.len());
            return NoticeExtraction {
                strategy: Some(strategy),
                notices,
            };
        }
        debug!("通知策略 {:?} 未命中", strategy);
    }

    NoticeExtraction::default()
}

fn course_update_notices(document: &Html) -> Vec<String> {
    let Some(titles) = selector("div#kbDiv a.list-group-item span.title") else {
        return Vec::new();
    };
    document
        .select(&titles)
        .map(element_text)
        .filter(|title| !title.is_empty())
        .collect()
}

fn reschedule_notices(document: &Html) -> Vec<String> {
    let (Some(items), Some(fraction)) = (
        selector("div#home a.list-group-item"),
        selector("span.fraction"),
    ) else {
        return Vec::new();
    };

    // 空白条目也保留，只要存在列表项本策略就算命中
    document
        .select(&items)
        .map(|item| {
            let time = item.select(&fraction).next().map(element_text).unwrap_or_default();
            let info = item.value().attr("data-tkxx").unwrap_or_default().trim().to_string();
            if time.is_empty() {
                info
            } else {
                format!("{}\n{}", time, info)
            }
        })
        .collect()
}

fn exam_notices(document: &Html) -> Vec<String> {
    let (Some(items), Some(title_sel), Some(details_sel), Some(paragraph_sel)) = (
        selector("div#exam a.list-group-item"),
        selector("span.title"),
        selector(".details"),
        selector("p"),
    ) else {
        return Vec::new();
    };

    document
        .select(&items)
        .filter_map(|item| {
            let title = item.select(&title_sel).next().map(element_text).unwrap_or_default();
            if title.is_empty() {
                return None;
            }

            let mut details = item.select(&details_sel).next().map(element_text).unwrap_or_default();
            if details.is_empty() {
                details = item.select(&paragraph_sel).next().map(element_text).unwrap_or_default();
            }
            if details.is_empty() {
                let full = element_text(item);
                details = normalize_whitespace(
                    &full.replace(&title, " ").replace(EXAM_NOTICE_BOILERPLATE, " "),
                );
            }

            Some(format!("{}{}{}", title, EXAM_NOTICE_SEPARATOR, details))
        })
        .collect()
}

/// 解析成绩明细表
///
/// 扫描至少三列的表格行，第一列去掉括号后匹配平时 / 实验 / 期末（补考），
/// 第二列是比例，第三列是成绩。其他行忽略；没有匹配行时返回全空的明细。
pub fn parse_grade_detail(html: &str) -> GradeDetail {
    let mut detail = GradeDetail::default();
    let (Some(rows), Some(cells)) = (selector("tr"), selector("td")) else {
        return detail;
    };

    let document = Html::parse_document(html);
    for row in document.select(&rows) {
        let columns: Vec<String> = row.select(&cells).map(element_text).collect();
        if columns.len() < 3 {
            continue;
        }

        let label = strip_brackets(&columns[0]);
        let ratio = columns[1].clone();
        let score = columns[2].clone();
        match GradeComponent::from_label(&label) {
            Some(GradeComponent::Regular) => {
                detail.regular_ratio = ratio;
                detail.regular_score = score;
            }
            Some(GradeComponent::Experiment) => {
                detail.experiment_ratio = ratio;
                detail.experiment_score = score;
            }
            Some(GradeComponent::Final) => {
                detail.final_ratio = ratio;
                detail.final_score = score;
            }
            None => debug!("忽略成绩明细行: {}", label),
        }
    }
    detail
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GradeComponent {
    Regular,
    Experiment,
    Final,
}

impl GradeComponent {
    fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if label.contains("平时") || lower.contains("regular") {
            Some(GradeComponent::Regular)
        } else if label.contains("实验") || lower.contains("experiment") {
            Some(GradeComponent::Experiment)
        } else if label.contains("期末")
            || label.contains("补考")
            || lower.contains("final")
            || lower.contains("makeup")
        {
            Some(GradeComponent::Final)
        } else {
            None
        }
    }
}

fn strip_brackets(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '【' | '】' | '[' | ']' | '(' | ')' | '（' | '）'))
        .collect::<String>()
        .trim()
        .to_string()
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// 元素的可见文字，空白折叠成单个空格
fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
