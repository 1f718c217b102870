/// 当前时间的毫秒时间戳
///
/// 门户的 `time` / `nd` 参数只用来绕过缓存，没有签名含义。
pub fn epoch_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_is_recent() {
        // 2020-01-01 之后
        assert!(epoch_millis() > 1_577_836_800_000);
    }
}
