/// 请求方法，门户只用到这两种
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// 发往门户的一次请求
///
/// `path` 可以是相对门户根地址的路径，也可以是完整 URL（跟随重定向时）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalRequest {
    pub method: HttpMethod,
    pub path: String,
    /// 追加到 URL 上的查询参数，按插入顺序
    pub query: Vec<(String, String)>,
    /// URL 编码的表单体；`None` 表示没有请求体
    pub form: Option<Vec<(String, String)>>,
    pub headers: Vec<(String, String)>,
}

impl PortalRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            form: None,
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 标记为 AJAX 请求，门户的查询接口都要求带上
    pub fn xhr(self) -> Self {
        self.header("X-Requested-With", "XMLHttpRequest")
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// 门户原始响应，读完响应体后立即交给调用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPortalResponse {
    pub status: u16,
    /// 响应头，名称统一小写，保留重复项
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// 实际请求的完整 URL
    pub url: String,
}

impl RawPortalResponse {
    /// 第一个同名响应头
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn location(&self) -> Option<&str> {
        self.header("location")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}
