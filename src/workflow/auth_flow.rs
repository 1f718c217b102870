//! 登录流程
//!
//! 状态：Idle → CsrfFetched → KeyFetched → LoginSubmitted → Authenticated / Rejected

use tracing::{debug, info, warn};

use crate::clients::PortalClient;
use crate::error::{AppResult, PortalError};
use crate::infrastructure::SessionClient;
use crate::models::Credentials;
use crate::services::html_extractor::extract_csrf_token;
use crate::services::page_classifier::{self, PortalPage};
use crate::services::password_cipher::encrypt_password;
use crate::utils::truncate_text;

/// 登录流程当前所处的步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Idle,
    CsrfFetched,
    KeyFetched,
    LoginSubmitted,
    Authenticated,
    Rejected,
}

/// 一次登录的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// 登录成功，`landing` 为门户给出的落地页
    Authenticated { landing: Option<String> },
    /// 账号密码被拒绝，不会自动重试
    InvalidCredentials { reason: String },
    /// 网络层失败，由调用方决定是否退避重试
    PortalUnreachable { reason: String },
    /// 重定向到了门户以外
    UnexpectedRedirect { target: String },
}

impl AuthResult {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthResult::Authenticated { .. })
    }

    /// 转成错误类型，方便用 `?` 传递
    pub fn into_result(self) -> AppResult<()> {
        match self {
            AuthResult::Authenticated { .. } => Ok(()),
            AuthResult::InvalidCredentials { reason } => Err(PortalError::InvalidCredentials { reason }),
            AuthResult::PortalUnreachable { reason } => Err(PortalError::PortalUnreachable {
                endpoint: "login".to_string(),
                reason,
            }),
            AuthResult::UnexpectedRedirect { target } => {
                Err(PortalError::UnexpectedRedirect { location: target })
            }
        }
    }
}

const GENERIC_REJECTION: &str = "登录失败，请检查账号和密码";

/// 门户提示 → 对用户展示的原因
const REJECTION_REASONS: [(&str, &str); 3] = [
    ("用户名或密码不正确", "用户名或密码错误"),
    ("验证码不正确", "验证码错误"),
    ("该账号已被锁定", "账号已被锁定，请稍后再试"),
];

/// 从登录页提取拒绝原因
pub fn rejection_reason(body: &str) -> String {
    REJECTION_REASONS
        .iter()
        .find(|(marker, _)| body.contains(marker))
        .map(|(_, reason)| reason.to_string())
        .or_else(|| page_classifier::login_tip(body))
        .unwrap_or_else(|| GENERIC_REJECTION.to_string())
}

/// 登录流程
///
/// 职责：
/// - 取 CSRF 令牌和公钥，加密密码并提交
/// - 根据响应形状判断登录结果
/// - 不发业务查询
pub struct AuthFlow<'a> {
    session: &'a SessionClient,
    client: &'a PortalClient,
    follow_redirect: bool,
    state: AuthState,
}

impl<'a> AuthFlow<'a> {
    /// 创建登录流程
    ///
    /// # 参数
    /// - `session`: 本账号的会话
    /// - `client`: 门户接口
    /// - `follow_redirect`: 登录成功后是否手动访问一次落地页
    pub fn new(session: &'a SessionClient, client: &'a PortalClient, follow_redirect: bool) -> Self {
        Self {
            session,
            client,
            follow_redirect,
            state: AuthState::Idle,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    fn transition(&mut self, next: AuthState) {
        debug!("登录状态 {:?} → {:?}", self.state, next);
        self.state = next;
    }

    /// 执行一次完整登录
    ///
    /// 开始前清空会话 Cookie。网络失败折叠为 `AuthResult::PortalUnreachable`；
    /// 页面结构变化（缺少 CSRF 令牌、公钥无法解析）和加密失败以错误返回。
    pub async fn login(&mut self, credentials: &Credentials) -> AppResult<AuthResult> {
        self.state = AuthState::Idle;
        self.session.clear_session();
        info!("🔐 开始登录: {}", credentials.username);

        match self.run(credentials).await {
            Ok(result) => {
                let next = if result.is_authenticated() {
                    AuthState::Authenticated
                } else {
                    AuthState::Rejected
                };
                self.transition(next);
                match &result {
                    AuthResult::Authenticated { .. } => info!("✓ 登录成功: {}", credentials.username),
                    other => warn!("⚠️ 登录未成功 ({}): {:?}", credentials.username, other),
                }
                Ok(result)
            }
            Err(PortalError::PortalUnreachable { endpoint, reason }) => {
                warn!("⚠️ 登录时无法访问教务系统 ({}): {}", endpoint, reason);
                self.transition(AuthState::Rejected);
                Ok(AuthResult::PortalUnreachable { reason })
            }
            Err(e) => {
                self.transition(AuthState::Rejected);
                Err(e)
            }
        }
    }

    async fn run(&mut self, credentials: &Credentials) -> AppResult<AuthResult> {
        let login_page = self.client.fetch_login_page(self.session).await?;
        let csrf_token = extract_csrf_token(&login_page.body).ok_or_else(|| {
            warn!(
                "⚠️ 登录页中找不到 CSRF 令牌: {}",
                truncate_text(&login_page.body, 200)
            );
            PortalError::parse_mismatch("csrftoken")
        })?;
        debug!("CSRF 令牌: {}", truncate_text(&csrf_token, 8));
        self.transition(AuthState::CsrfFetched);

        let key = self.client.fetch_public_key(self.session).await?;
        self.transition(AuthState::KeyFetched);

        let encrypted = encrypt_password(credentials.password(), &key)?;
        let response = self
            .client
            .submit_login(self.session, &credentials.username, &encrypted, &csrf_token)
            .await?;
        self.transition(AuthState::LoginSubmitted);

        let page = page_classifier::classify(&response, self.session.base_url());
        debug!("登录响应: {} → {:?}", response.status, page);

        Ok(match page {
            PortalPage::DashboardRedirect { location } => self.land(location).await,
            PortalPage::LoginRedirect { .. } => AuthResult::InvalidCredentials {
                reason: GENERIC_REJECTION.to_string(),
            },
            PortalPage::LoginPage { .. } => AuthResult::InvalidCredentials {
                reason: rejection_reason(&response.body),
            },
            PortalPage::ForeignRedirect { location } => AuthResult::UnexpectedRedirect { target: location },
            PortalPage::JsonPayload | PortalPage::HtmlFragment => AuthResult::Authenticated { landing: None },
            PortalPage::SessionTimeout => AuthResult::PortalUnreachable {
                reason: "登录请求返回会话超时".to_string(),
            },
            PortalPage::Unexpected { status } => AuthResult::PortalUnreachable {
                reason: format!("登录请求返回状态码 {}", status),
            },
        })
    }

    /// 跟随落地页重定向，落到登录页仍算登录失败
    async fn land(&mut self, location: String) -> AuthResult {
        if !self.follow_redirect {
            return AuthResult::Authenticated {
                landing: Some(location),
            };
        }

        match self.client.follow(self.session, &location).await {
            Ok(landing) => match page_classifier::classify(&landing, self.session.base_url()) {
                PortalPage::LoginPage { .. } => AuthResult::InvalidCredentials {
                    reason: rejection_reason(&landing.body),
                },
                PortalPage::LoginRedirect { .. } | PortalPage::SessionTimeout => {
                    AuthResult::InvalidCredentials {
                        reason: GENERIC_REJECTION.to_string(),
                    }
                }
                _ => AuthResult::Authenticated {
                    landing: Some(location),
                },
            },
            Err(e) => {
                // 登录 POST 已经成功，落地页只用于补全服务端会话
                warn!("⚠️ 访问落地页失败，仍视为已登录: {}", e);
                AuthResult::Authenticated {
                    landing: Some(location),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_reason_mapping() {
        assert_eq!(
            rejection_reason("<p id=\"tips\">用户名或密码不正确，请重新输入！</p>"),
            "用户名或密码错误"
        );
        assert_eq!(rejection_reason("验证码不正确"), "验证码错误");
        assert_eq!(rejection_reason("该账号已被锁定"), "账号已被锁定，请稍后再试");
        assert_eq!(rejection_reason("<p id=\"tips\">系统维护中</p>"), "系统维护中");
        assert_eq!(rejection_reason("<html></html>"), GENERIC_REJECTION);
    }

    #[test]
    fn test_auth_result_into_result() {
        assert!(AuthResult::Authenticated { landing: None }.into_result().is_ok());
        assert_eq!(
            AuthResult::InvalidCredentials { reason: "x".into() }.into_result(),
            Err(PortalError::InvalidCredentials { reason: "x".into() })
        );
        assert!(matches!(
            AuthResult::UnexpectedRedirect { target: "https://a".into() }.into_result(),
            Err(PortalError::UnexpectedRedirect { .. })
        ));
        assert!(AuthResult::PortalUnreachable { reason: "t".into() }
            .into_result()
            .unwrap_err()
            .is_retryable_by_caller());
    }
}
