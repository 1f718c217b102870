use std::collections::HashMap;

/// 按主机划分的 Cookie 存储
///
/// 职责：
/// - 解析 `Set-Cookie`，只保留 `name=value`，忽略属性
/// - 同名 Cookie 后写覆盖先写
/// - 拼出请求用的 `Cookie` 头
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    hosts: HashMap<String, Vec<(String, String)>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析单个 `Set-Cookie` 头
    ///
    /// 先按第一个 `;` 切掉属性，再按第一个 `=` 切出名称和值。
    /// 值为空或为 `deleted` 时返回 `None`。
    pub fn parse_set_cookie(raw: &str) -> Option<(String, String)> {
        let pair = raw.split(';').next()?;
        let (name, value) = pair.split_once('=')?;
        let (name, value) = (name.trim(), value.trim());
        if name.is_empty() || value.is_empty() || value == "deleted" {
            return None;
        }
        Some((name.to_string(), value.to_string()))
    }

    /// 合并一个响应里的全部 `Set-Cookie`，按出现顺序，后写覆盖先写
    ///
    /// # 返回
    /// 实际生效的条数
    pub fn merge_set_cookies<'a, I>(&mut self, host: &str, headers: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let parsed: Vec<(String, String)> = headers
            .into_iter()
            .filter_map(Self::parse_set_cookie)
            .collect();
        if parsed.is_empty() {
            return 0;
        }

        let cookies = self.hosts.entry(host.to_string()).or_default();
        for (name, value) in &parsed {
            match cookies.iter_mut().find(|(n, _)| n == name) {
                Some(existing) => existing.1 = value.clone(),
                None => cookies.push((name.clone(), value.clone())),
            }
        }
        parsed.len()
    }

    /// 请求头 `Cookie` 的值，没有 Cookie 时返回 `None`
    pub fn header_for(&self, host: &str) -> Option<String> {
        let cookies = self.hosts.get(host).filter(|c| !c.is_empty())?;
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    pub fn get(&self, host: &str, name: &str) -> Option<&str> {
        self.hosts
            .get(host)?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self, host: &str) -> usize {
        self.hosts.get(host).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.values().all(Vec::is_empty)
    }

    pub fn clear_host(&mut self, host: &str) {
        self.hosts.remove(host);
    }

    pub fn clear(&mut self) {
        self.hosts.clear();
    }
}
