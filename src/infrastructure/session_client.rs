//! 会话客户端 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端和 Cookie 状态，只暴露"发送请求"的能力

use std::sync::{Mutex, MutexGuard};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::Url;
use tracing::debug;

use super::cookie_jar::CookieJar;
use super::http::{HttpMethod, PortalRequest, RawPortalResponse};
use crate::config::Config;
use crate::error::{AppResult, ConfigError, PortalError};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// 会话客户端
///
/// 职责：
/// - 持有唯一的 reqwest 客户端和 Cookie 状态
/// - 禁止自动重定向，3xx 原样返回给调用方
/// - 每个请求前附上 Cookie，每个响应后合并 Set-Cookie
/// - 不认识登录流程 / 成绩 / 课表
///
/// 一个账号一个实例，不同账号之间不共享 Cookie。
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    cookies: Mutex<CookieJar>,
}

impl SessionClient {
    /// 创建新的会话客户端，Cookie 为空
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ConfigError::invalid("base_url", e.to_string()))?;
        if base_url.host_str().is_none() {
            return Err(ConfigError::invalid("base_url", "缺少主机名"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| ConfigError::invalid("user_agent", e.to_string()))?,
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| ConfigError::invalid("accept_language", e.to_string()))?,
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::invalid("http_client", e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            cookies: Mutex::new(CookieJar::new()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// 门户主机名
    pub fn host(&self) -> &str {
        self.base_url.host_str().unwrap_or_default()
    }

    /// 把相对路径或完整 URL 解析成请求地址
    pub fn resolve(&self, path: &str) -> AppResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PortalError::unreachable(path, format!("无效的地址: {}", e)))
    }

    /// 发送请求
    ///
    /// # 参数
    /// - `request`: 请求描述
    ///
    /// # 返回
    /// 原始响应；3xx 不会被跟随。网络错误和超时返回 `PortalUnreachable`。
    pub async fn send(&self, request: PortalRequest) -> AppResult<RawPortalResponse> {
        let mut url = self.resolve(&request.path)?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        let host = url.host_str().unwrap_or_default().to_string();
        let endpoint = url.path().to_string();

        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(url.clone()),
            HttpMethod::Post => self.http.post(url.clone()),
        };
        if let Some(cookie) = self.cookie_header(&host) {
            builder = builder.header(header::COOKIE, cookie);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        debug!("→ {:?} {}", request.method, url);
        let response = builder
            .send()
            .await
            .map_err(|e| PortalError::unreachable(endpoint.as_str(), e))?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        // 在读取响应体之前一次性合并，读取中途被取消也不会只写进一半
        let merged = self.lock_cookies().merge_set_cookies(
            &host,
            headers
                .iter()
                .filter(|(name, _)| name == "set-cookie")
                .map(|(_, value)| value.as_str()),
        );

        let body = response
            .text()
            .await
            .map_err(|e| PortalError::unreachable(endpoint.as_str(), e))?;

        debug!(
            "← {} {} ({} 字节, 合并 {} 个 Cookie)",
            status,
            endpoint,
            body.len(),
            merged
        );

        Ok(RawPortalResponse {
            status,
            headers,
            body,
            url: url.to_string(),
        })
    }

    /// 清空全部 Cookie，切换账号或重新登录前调用
    pub fn clear_session(&self) {
        self.lock_cookies().clear();
        debug!("会话 Cookie 已清空");
    }

    /// 清空某个主机的 Cookie
    pub fn clear_host(&self, host: &str) {
        self.lock_cookies().clear_host(host);
    }

    /// 当前会发送给 `host` 的 Cookie 头
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        self.lock_cookies().header_for(host)
    }

    pub fn cookie_value(&self, host: &str, name: &str) -> Option<String> {
        self.lock_cookies().get(host, name).map(str::to_string)
    }

    fn lock_cookies(&self) -> MutexGuard<'_, CookieJar> {
        // 持锁期间没有 await，也不会 panic，中毒时数据仍是完整的
        self.cookies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> SessionClient {
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        SessionClient::new(&config).unwrap()
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let session = client("https://jwgl.example.edu.cn");
        assert_eq!(session.host(), "jwgl.example.edu.cn");
        assert_eq!(
            session.resolve("/xtgl/login_slogin.html").unwrap().as_str(),
            "https://jwgl.example.edu.cn/xtgl/login_slogin.html"
        );
        assert_eq!(
            session.resolve("https://other.example.com/a").unwrap().as_str(),
            "https://other.example.com/a"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = Config {
            base_url: "::bad::".to_string(),
            ..Config::default()
        };
        assert!(SessionClient::new(&config).is_err());
    }

    #[test]
    fn test_unresolvable_path_is_unreachable() {
        let session = client("https://jwgl.example.edu.cn");
        let err = tokio_test::block_on(session.send(PortalRequest::get("http://[::1"))).unwrap_err();
        assert!(matches!(err, PortalError::PortalUnreachable { .. }));
    }

    #[test]
    fn test_clear_session_starts_empty() {
        let session = client("https://jwgl.example.edu.cn");
        assert_eq!(session.cookie_header("jwgl.example.edu.cn"), None);
        session.clear_session();
        assert_eq!(session.cookie_value("jwgl.example.edu.cn", "JSESSIONID"), None);
    }
}
