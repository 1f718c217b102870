//! 门户 JSON 响应的原始形状
//!
//! 门户对同一字段时而返回字符串、时而返回数字，这里的字符串字段统一宽松解析。

use serde::Deserialize;

/// 课表查询响应
#[derive(Debug, Deserialize)]
pub struct TimetableResponse {
    #[serde(rename = "kbList", default)]
    pub kb_list: Option<Vec<TimetableItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TimetableItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xqj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jcs: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zcd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xnm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xqm: Option<String>,
}

/// 分页查询响应（成绩、考试、培养方案）
#[derive(Debug, Deserialize)]
pub struct PagedResponse<T> {
    #[serde(default)]
    pub items: Option<Vec<T>>,
    #[serde(rename = "totalResult", default, deserialize_with = "lenient_string")]
    pub total_result: Option<String>,
}

impl<T> PagedResponse<T> {
    pub fn into_items(self) -> Vec<T> {
        self.items.unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GradeItem {
    #[serde(deserialize_with = "lenient_string")]
    pub xh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xnm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xqm: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xf: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jd: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ksxz: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sfxwkc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jxb_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcxzmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub khfsmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub jsxm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExamItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kssj: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub cdxqmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zwh: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub zw: Option<String>,
}

/// 培养方案查询结果
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlanInfoItem {
    #[serde(deserialize_with = "lenient_string")]
    pub jxzxjhxx_id: Option<String>,
}

/// 培养方案课程
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlanCourseItem {
    #[serde(deserialize_with = "lenient_string")]
    pub kch: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kch_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub kcmc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub sfxwkc: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub xwkc: Option<String>,
}

/// 取出字段值，`None` 和空白都视为空串
pub fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// 第一个非空字段
pub fn first_text(values: &[&Option<String>]) -> String {
    values
        .iter()
        .map(|v| text(v))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

// 字符串、整数、浮点、布尔都接受，null 为 None
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number, bool or null")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}
