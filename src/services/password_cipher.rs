//! 登录密码加密
//!
//! 门户用 RSA/ECB/PKCS1Padding 解密 `mm` 字段，密文以标准 Base64 提交。

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::rand_core::{CryptoRngCore, OsRng};
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};

use crate::error::{AppResult, PortalError};
use crate::models::{KeyEncoding, RsaKey};

/// 用门户公钥加密密码
///
/// # 参数
/// - `password`: 明文密码
/// - `key`: 本次登录获取的公钥
///
/// # 返回
/// Base64 编码的密文，长度与模数字节数一致
pub fn encrypt_password(password: &str, key: &RsaKey) -> AppResult<String> {
    let mut rng = OsRng;
    encrypt_password_with_rng(password, key, &mut rng)
}

/// 与 [`encrypt_password`] 相同，但由调用方提供填充用的随机数源
pub fn encrypt_password_with_rng<R: CryptoRngCore>(
    password: &str,
    key: &RsaKey,
    rng: &mut R,
) -> AppResult<String> {
    let public_key = public_key(key)?;
    let encrypted = public_key
        .encrypt(rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|e| PortalError::Encryption(format!("RSA 加密失败: {}", e)))?;
    Ok(STANDARD.encode(encrypted))
}

/// 把门户下发的模数和指数解析成公钥
pub fn public_key(key: &RsaKey) -> AppResult<RsaPublicKey> {
    let modulus = decode_component(&key.modulus, key.encoding, "modulus")?;
    let exponent = decode_component(&key.exponent, key.encoding, "exponent")?;
    RsaPublicKey::new(modulus, exponent)
        .map_err(|e| PortalError::Encryption(format!("公钥无效: {}", e)))
}

fn decode_component(value: &str, encoding: KeyEncoding, field: &str) -> AppResult<BigUint> {
    let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(PortalError::Encryption(format!("{} 为空", field)));
    }

    let bytes = match encoding {
        KeyEncoding::Base64 => STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| PortalError::Encryption(format!("{} 不是合法的 Base64: {}", field, e)))?,
        KeyEncoding::Hex => {
            let padded = if cleaned.len() % 2 == 1 {
                format!("0{}", cleaned)
            } else {
                cleaned
            };
            hex::decode(padded)
                .map_err(|e| PortalError::Encryption(format!("{} 不是合法的十六进制: {}", field, e)))?
        }
    };

    let number = BigUint::from_bytes_be(&bytes);
    if number == BigUint::from(0u8) {
        return Err(PortalError::Encryption(format!("{} 为 0", field)));
    }
    Ok(number)
}
