use thiserror::Error;

/// 教务系统交互错误
///
/// 所有变体都可以 `Clone`：重新登录的结果会被同一账号上排队等待的请求复用。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    /// 密码加密失败（公钥格式错误、明文过长等）
    #[error("密码加密失败: {0}")]
    Encryption(String),

    /// 门户拒绝了账号或密码
    #[error("登录被拒绝: {reason}")]
    InvalidCredentials { reason: String },

    /// 会话已失效，需要重新登录
    #[error("会话已过期，需要重新登录")]
    SessionExpired,

    /// 网络层失败（连接、超时、读取响应体）
    #[error("无法访问教务系统 ({endpoint}): {reason}")]
    PortalUnreachable { endpoint: String, reason: String },

    /// 重定向到了门户之外的地址
    #[error("教务系统返回了意外的重定向: {location}")]
    UnexpectedRedirect { location: String },

    /// 页面结构与预期不符（缺少 CSRF 令牌等）
    #[error("无法从响应中解析 {what}")]
    ParseMismatch { what: String },

    /// 门户返回了无法处理的状态码
    #[error("教务系统返回异常状态码 ({endpoint}): {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    /// JSON 响应解码失败
    #[error("响应解码失败 ({endpoint}): {reason}")]
    Decode { endpoint: String, reason: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// 配置项取值非法
    #[error("配置项 {field} 非法: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ========== 便捷构造函数 ==========

impl PortalError {
    /// 创建网络不可达错误
    pub fn unreachable(endpoint: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PortalError::PortalUnreachable {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建解码错误
    pub fn decode(endpoint: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PortalError::Decode {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// 创建页面结构不匹配错误
    pub fn parse_mismatch(what: impl Into<String>) -> Self {
        PortalError::ParseMismatch { what: what.into() }
    }

    /// 创建登录被拒绝错误
    pub fn invalid_credentials(reason: impl Into<String>) -> Self {
        PortalError::InvalidCredentials {
            reason: reason.into(),
        }
    }

    /// 暂时性错误：会话过期或网络抖动
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortalError::SessionExpired | PortalError::PortalUnreachable { .. }
        )
    }

    /// 需要调用方自行决定是否退避重试的错误
    ///
    /// `SessionExpired` 已在账号会话内部重新登录并重试过一次，不在此列。
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self, PortalError::PortalUnreachable { .. })
    }
}

impl ConfigError {
    /// 创建配置项非法错误
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 门户交互结果类型
pub type AppResult<T> = Result<T, PortalError>;
