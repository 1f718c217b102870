//! 集成测试用的本地门户
//!
//! 在 127.0.0.1 上起一个 axum 服务，所有请求都落到同一个兜底处理函数：
//! 先记录请求，再按脚本返回响应。

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use portal_engine::Config;
use reqwest::Url;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPrivateKey};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

// ========== 测试密钥 ==========

pub const MODULUS_B64: &str = "4Ylt3yCRF0aUgGwUGrjg12kZalUhV8uFnDSH+oiBHP3tb5+V5RATabpdSeUlam5tFGeSW5/aZ2OipmOzTXit65PFcGOoTwqKVcXjJ5CTgX/GceV+1/MWPqsDOQ3GQ0y5Uq/pbvxVgXBISTNFMCZ9wLCBmE2G8rhw3CNtQZX8a4E=";
const MODULUS_HEX: &str = "e1896ddf2091174694806c141ab8e0d769196a552157cb859c3487fa88811cfded6f9f95e5101369ba5d49e5256a6e6d1467925b9fda6763a2a663b34d78adeb93c57063a84f0a8a55c5e3279093817fc671e57ed7f3163eab03390dc6434cb952afe96efc5581704849334530267dc0b081984d86f2b870dc236d4195fc6b81";
const PRIVATE_EXPONENT_HEX: &str = "336ade6699091af25756b3cd1d8e7a8c0184eecdfbad05542f99764ab2a624d2eb37a07d4edc8c60754161606158535680e95fdf8da1002321e8a72030904badd4ce733f959855e53790bc7e847e9bc0bb04909d837a74544a72a4b3f927a244bcc0a5a4d9ff90370be8d90250ceda2dfa11b3a4d8b81dc71a6fe3faf9e268c1";
const PRIME_P_HEX: &str = "f40888976bc4f56ff283c504e41e690741781b998359161102a6e64397326b150141a9937a2403e23006f9a1d9ffc87bef4cccd7e49f59170573b0baf7fb7699";
const PRIME_Q_HEX: &str = "ec98b343a119be3db5d3feff9e18ceab278e47599e2439763dc9b4645768003845351e210b7279ede802d039fb7991906a1a27fdbda7b705ac24883c27a6f529";

fn hex_uint(value: &str) -> BigUint {
    BigUint::from_bytes_be(&hex::decode(value).unwrap())
}

/// 用测试私钥解密登录表单里的 `mm`
pub fn decrypt_password(ciphertext_b64: &str) -> String {
    use base64::Engine;
    let key = RsaPrivateKey::from_components(
        hex_uint(MODULUS_HEX),
        BigUint::from(65537u32),
        hex_uint(PRIVATE_EXPONENT_HEX),
        vec![hex_uint(PRIME_P_HEX), hex_uint(PRIME_Q_HEX)],
    )
    .unwrap();
    let ciphertext = base64::engine::general_purpose::STANDARD
        .decode(ciphertext_b64)
        .unwrap();
    String::from_utf8(key.decrypt(Pkcs1v15Encrypt, &ciphertext).unwrap()).unwrap()
}

pub fn public_key_json() -> String {
    format!(r#"{{"modulus":"{}","exponent":"AQAB"}}"#, MODULUS_B64)
}

pub const CSRF_TOKEN: &str = "csrf-2f9c";

pub fn login_page_html(tip: Option<&str>) -> String {
    format!(
        r#"<html><head><title>用户登录</title></head><body>
<form action="/xtgl/login_slogin.html" method="post">
<input type="hidden" id="csrftoken" name="csrftoken" value="{}"/>
<input type="hidden" id="rsaKey" value=""/>
<input type="text" name="yhm" id="yhm"/>
<input type="password" name="mm" id="mm"/>
{}
</form></body></html>"#,
        CSRF_TOKEN,
        tip.map(|t| format!(r#"<p id="tips">{}</p>"#, t))
            .unwrap_or_default()
    )
}

pub const DASHBOARD_PATH: &str = "/xtgl/index_initMenu.html";

// ========== 请求与响应 ==========

/// 服务端收到的请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// 请求目标，含查询串
    pub target: String,
    /// 小写的头名称
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    fn url(&self) -> Url {
        Url::parse(&format!("http://mock{}", self.target)).unwrap()
    }

    pub fn path(&self) -> String {
        self.url().path().to_string()
    }

    pub fn query(&self, name: &str) -> Option<String> {
        self.url()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn form(&self, name: &str) -> Option<String> {
        Url::parse(&format!("http://mock/?{}", self.body))
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    pub fn cookie(&self) -> String {
        self.header("cookie").unwrap_or_default().to_string()
    }
}

/// 脚本化响应
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200).with_body(body)
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::ok(body).with_header("Content-Type", "text/html;charset=UTF-8")
    }

    pub fn json(body: impl Into<String>) -> Self {
        Self::ok(body).with_header("Content-Type", "application/json;charset=UTF-8")
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(302).with_header("Location", location)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_cookie(self, cookie: &str) -> Self {
        self.with_header("Set-Cookie", cookie)
    }
}

type Handler = Arc<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

// ========== 服务 ==========

pub struct MockServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::new(Shared {
            handler: Arc::new(handler),
            requests: requests.clone(),
        });

        let app = Router::new().fallback(record_and_reply).with_state(shared);
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn config(&self) -> Config {
        Config {
            base_url: self.base_url(),
            connect_timeout_secs: 5,
            request_timeout_secs: 5,
            sync_delay_ms: 0,
            ..Config::default()
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// 某个路径（不含查询串）收到的请求
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path() == path)
            .collect()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests_to(path)
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Shared {
    handler: Handler,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// 兜底处理函数：记录方法、请求目标、头和表单正文，再交给脚本
async fn record_and_reply(State(shared): State<Arc<Shared>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        target: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string()),
        headers: parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body,
    };
    shared.requests.lock().unwrap().push(recorded.clone());

    let scripted = (shared.handler)(&recorded);
    let mut builder = Response::builder().status(StatusCode::from_u16(scripted.status).unwrap());
    for (name, value) in &scripted.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.body(Body::from(scripted.body)).unwrap()
}

/// 一个绑定后立即释放的端口，连接会被拒绝
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ========== 脚本化门户 ==========

/// 会话有效性由 `JSESSIONID` 决定：每次登录签发新的会话号，
/// 查询请求带的不是当前会话号就返回 901。
#[derive(Default)]
pub struct PortalState {
    pub logins: AtomicUsize,
    current_session: AtomicUsize,
    /// 之后的登录都被拒绝
    pub reject_logins: AtomicBool,
    /// 查询一律返回 901
    pub always_expired: AtomicBool,
}

impl PortalState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 让当前会话失效
    pub fn expire_session(&self) {
        self.current_session.store(0, Ordering::SeqCst);
    }

    fn session_valid(&self, request: &RecordedRequest) -> bool {
        let current = self.current_session.load(Ordering::SeqCst);
        current != 0
            && !self.always_expired.load(Ordering::SeqCst)
            && request
                .cookie()
                .split("; ")
                .any(|pair| pair == format!("JSESSIONID=sess-{}", current))
    }
}

/// 组装一个完整的门户：登录相关接口固定，查询接口交给 `queries`
pub fn scripted_portal<Q>(
    state: Arc<PortalState>,
    queries: Q,
) -> impl Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static
where
    Q: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
{
    move |request| match (request.method.as_str(), request.path().as_str()) {
        ("GET", "/xtgl/login_slogin.html") => {
            MockResponse::html(login_page_html(None)).with_cookie("JSESSIONID=anon; Path=/")
        }
        ("GET", "/xtgl/login_getPublicKey.html") => MockResponse::json(public_key_json()),
        ("POST", "/xtgl/login_slogin.html") => {
            let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
            if state.reject_logins.load(Ordering::SeqCst) {
                return MockResponse::html(login_page_html(Some("用户名或密码不正确，请重新输入！")));
            }
            state.current_session.store(n, Ordering::SeqCst);
            MockResponse::redirect(DASHBOARD_PATH)
                .with_cookie(&format!("JSESSIONID=sess-{}; Path=/; HttpOnly", n))
        }
        ("GET", DASHBOARD_PATH) => MockResponse::html("<html><body>欢迎使用教务系统</body></html>"),
        _ if !state.session_valid(request) => MockResponse::status(901),
        _ => queries(request),
    }
}
