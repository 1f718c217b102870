use std::fmt;

use serde::Deserialize;

/// 登录凭据
///
/// 只在一次登录请求中使用；`Debug` 输出不会包含明文密码。
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"******")
            .finish()
    }
}

/// 公钥分量的文本编码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEncoding {
    /// 门户当前使用的标准 Base64
    #[default]
    Base64,
    /// 十六进制大端
    Hex,
}

/// 门户下发的 RSA 公钥
///
/// 每次登录都重新获取，不跨会话缓存。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RsaKey {
    pub modulus: String,
    pub exponent: String,
    #[serde(default)]
    pub encoding: KeyEncoding,
}

impl RsaKey {
    pub fn base64(modulus: impl Into<String>, exponent: impl Into<String>) -> Self {
        Self {
            modulus: modulus.into(),
            exponent: exponent.into(),
            encoding: KeyEncoding::Base64,
        }
    }

    pub fn hex(modulus: impl Into<String>, exponent: impl Into<String>) -> Self {
        Self {
            modulus: modulus.into(),
            exponent: exponent.into(),
            encoding: KeyEncoding::Hex,
        }
    }
}
