//! 门户响应分类
//!
//! 把状态码、`Location`、`Content-Type` 和登录表单特征归纳成一个封闭的枚举，
//! 登录流程和查询层都只看分类结果，不各自做字符串判断。

use regex::Regex;
use reqwest::Url;

use crate::infrastructure::RawPortalResponse;

/// 门户会话超时时返回的非标准状态码
pub const SESSION_TIMEOUT_STATUS: u16 = 901;

/// 门户响应的形状
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalPage {
    /// 200 且正文是登录页，`tip` 为页面上的错误提示
    LoginPage { tip: Option<String> },
    /// 重定向回登录页
    LoginRedirect { location: String },
    /// 重定向到门户内的其他页面
    DashboardRedirect { location: String },
    /// 重定向到门户以外的主机
    ForeignRedirect { location: String },
    /// 901 会话超时
    SessionTimeout,
    JsonPayload,
    HtmlFragment,
    Unexpected { status: u16 },
}

impl PortalPage {
    /// 是否说明会话已经失效
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            PortalPage::LoginPage { .. } | PortalPage::LoginRedirect { .. } | PortalPage::SessionTimeout
        )
    }
}

/// 对响应分类
///
/// # 参数
/// - `response`: 原始响应
/// - `portal`: 门户根地址，用来区分站内和站外重定向
pub fn classify(response: &RawPortalResponse, portal: &Url) -> PortalPage {
    let status = response.status;

    if status == SESSION_TIMEOUT_STATUS {
        return PortalPage::SessionTimeout;
    }

    if response.is_redirect() {
        let Some(location) = response.location() else {
            return PortalPage::Unexpected { status };
        };
        let base = Url::parse(&response.url).unwrap_or_else(|_| portal.clone());
        let Some(target) = resolve_location(&base, location) else {
            return PortalPage::Unexpected { status };
        };

        let location = target.to_string();
        if target.host_str() != portal.host_str() {
            return PortalPage::ForeignRedirect { location };
        }
        if target.path().contains("login_slogin") {
            return PortalPage::LoginRedirect { location };
        }
        return PortalPage::DashboardRedirect { location };
    }

    if !response.is_success() {
        return PortalPage::Unexpected { status };
    }

    if is_login_page(&response.body) {
        return PortalPage::LoginPage {
            tip: login_tip(&response.body),
        };
    }

    let is_json = response
        .content_type()
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    let trimmed = response.body.trim_start();
    if is_json || trimmed.starts_with('{') || trimmed.starts_with('[') {
        PortalPage::JsonPayload
    } else {
        PortalPage::HtmlFragment
    }
}

/// 正文是否是登录页
///
/// 特征：RSA 公钥隐藏域、同时出现账号和密码输入框、"用户登录"标题，
/// 或者登录错误提示 `id="tips"`（门户有时只返回这一段错误片段）。
pub fn is_login_page(body: &str) -> bool {
    body.contains("id=\"rsaKey\"")
        || (body.contains("name=\"yhm\"") && body.contains("name=\"mm\""))
        || body.contains("用户登录")
        || body.contains("id=\"tips\"")
}

/// 登录页上 `<p id="tips">` 的文字
pub fn login_tip(body: &str) -> Option<String> {
    let re = Regex::new(r#"<p\s+id="tips"[^>]*>([^<]+)</p>"#).ok()?;
    let tip = re.captures(body)?.get(1)?.as_str().trim();
    (!tip.is_empty()).then(|| tip.to_string())
}

/// 按 `base` 解析 `Location`，支持相对路径
pub fn resolve_location(base: &Url, location: &str) -> Option<Url> {
    base.join(location.trim()).ok()
}
