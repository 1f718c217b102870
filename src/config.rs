use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// 桌面版 Chrome 的 User-Agent，门户会拒绝不像浏览器的请求
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 教务系统根地址
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    /// 建立连接超时（秒）
    pub connect_timeout_secs: u64,
    /// 单个请求总超时（秒）
    pub request_timeout_secs: u64,
    /// 成绩查询每页条数，设大以避免分页
    pub grade_page_size: u32,
    /// 考试查询每页条数
    pub exam_page_size: u32,
    /// 登录成功后是否手动跟随一次重定向
    pub follow_login_redirect: bool,
    /// 同步历史学期时每个学期之间的间隔（毫秒）
    pub sync_delay_ms: u64,
    /// 同时同步的账号数量
    pub max_concurrent_accounts: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 最早同步的学年，缺省为当前年份往前四年
    pub first_enrolment_year: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://jwgl.suse.edu.cn".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "zh-CN,zh;q=0.9".to_string(),
            connect_timeout_secs: 15,
            request_timeout_secs: 15,
            grade_page_size: 100,
            exam_page_size: 100,
            follow_login_redirect: true,
            sync_delay_ms: 300,
            max_concurrent_accounts: 4,
            verbose_logging: false,
            first_enrolment_year: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            base_url: std::env::var("PORTAL_BASE_URL").unwrap_or(default.base_url),
            user_agent: std::env::var("PORTAL_USER_AGENT").unwrap_or(default.user_agent),
            accept_language: default.accept_language,
            connect_timeout_secs: std::env::var("PORTAL_CONNECT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.connect_timeout_secs),
            request_timeout_secs: std::env::var("PORTAL_REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            grade_page_size: std::env::var("PORTAL_GRADE_PAGE_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.grade_page_size),
            exam_page_size: default.exam_page_size,
            follow_login_redirect: default.follow_login_redirect,
            sync_delay_ms: std::env::var("PORTAL_SYNC_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.sync_delay_ms),
            max_concurrent_accounts: std::env::var("MAX_CONCURRENT_ACCOUNTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_accounts),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            first_enrolment_year: std::env::var("PORTAL_FIRST_YEAR").ok().and_then(|v| v.parse().ok()),
        }
    }

    /// 从 TOML 文件加载配置，缺失的字段取默认值
    ///
    /// # 参数
    /// - `path`: 配置文件路径
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// 从 TOML 文本解析配置
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 检查配置是否可用
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::invalid("base_url", "缺少主机名"));
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid("base_url", format!("不支持的协议 {}", url.scheme())));
        }
        if self.grade_page_size == 0 {
            return Err(ConfigError::invalid("grade_page_size", "必须大于 0"));
        }
        if self.exam_page_size == 0 {
            return Err(ConfigError::invalid("exam_page_size", "必须大于 0"));
        }
        if self.max_concurrent_accounts == 0 {
            return Err(ConfigError::invalid("max_concurrent_accounts", "必须大于 0"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sync_delay(&self) -> Duration {
        Duration::from_millis(self.sync_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(config.follow_login_redirect);
    }

    #[test]
    fn test_toml_partial_override() {
        let config = Config::from_toml_str(
            r#"
            base_url = "http://127.0.0.1:8080"
            grade_page_size = 50
            first_enrolment_year = 2021
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.grade_page_size, 50);
        assert_eq!(config.first_enrolment_year, Some(2021));
        // 未出现的字段取默认值
        assert_eq!(config.exam_page_size, 100);
        assert_eq!(config.sync_delay_ms, 300);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "base_url", .. })
        ));

        let config = Config {
            grade_page_size: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "grade_page_size", .. })
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Config::from_toml_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
