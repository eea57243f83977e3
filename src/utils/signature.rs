// 签名工具函数
// 提供网关参数签名 (MD5前缀密钥)、回调验签以及转发载荷的HMAC签名

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 签名字段名，任何时候都不参与签名计算
pub const SIGN_FIELD: &str = "sign";

/// 待签名参数集合
///
/// 按键的字节序排序存储规范化后的字符串值。
/// null、空字符串以及 `sign` 字段不会被存入。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedParams {
    entries: BTreeMap<String, String>,
}

impl SignedParams {
    /// 创建空的参数集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 从JSON对象构建参数集合 (回调验签使用)
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut params = Self::new();
        for (key, value) in object {
            params.insert(key, value.clone());
        }
        params
    }

    /// 插入参数，值会被规范化为字符串
    ///
    /// 返回该参数是否被保留
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        let key = key.into();
        if key == SIGN_FIELD {
            return false;
        }

        match canonical_value(&value.into()) {
            Some(rendered) => {
                self.entries.insert(key, rendered);
                true
            }
            None => {
                self.entries.remove(&key);
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 生成待签名字符串: 密钥 + 按键排序后的 key + value，无分隔符
    pub fn canonical_string(&self, secret_key: &str) -> String {
        let capacity = secret_key.len()
            + self
                .entries
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>();

        let mut buffer = String::with_capacity(capacity);
        buffer.push_str(secret_key);
        for (key, value) in &self.entries {
            buffer.push_str(key);
            buffer.push_str(value);
        }
        buffer
    }
}

/// 将参数值规范化为参与签名的字符串
///
/// 整数不带小数点，其余数字按最短十进制形式，布尔值为 true/false，
/// 数组和对象使用紧凑JSON文本。null 与空字符串返回 None。
pub fn canonical_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| f.to_string())
            }
        }
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).ok(),
    }
}

/// 计算参数签名
///
/// # Arguments
/// * `params` - 待签名参数
/// * `secret_key` - 签名密钥 (由调用方决定使用哪一个)
///
/// # Returns
/// * 小写十六进制的MD5签名
pub fn sign(params: &SignedParams, secret_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(params.canonical_string(secret_key).as_bytes());
    hex::encode(hasher.finalize())
}

/// 验证参数签名 (忽略大小写)
///
/// # Arguments
/// * `params` - 收到的参数 (不含 sign)
/// * `secret_key` - 签名密钥
/// * `received_signature` - 对方提供的签名
///
/// # Returns
/// * 签名是否有效
pub fn verify(params: &SignedParams, secret_key: &str, received_signature: &str) -> bool {
    let expected = sign(params, secret_key);
    constant_time_eq(&expected, &received_signature.trim().to_ascii_lowercase())
}

/// 为出站请求体追加签名字段
///
/// 签名覆盖请求体中除 sign 外的全部字段
pub fn attach_signature(body: &mut Map<String, Value>, secret_key: &str) {
    let signature = sign(&SignedParams::from_object(body), secret_key);
    body.insert(SIGN_FIELD.to_string(), Value::String(signature));
}

/// 常量时间字符串比较
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// 生成HMAC-SHA256签名 (转发给后端的通知使用)
///
/// # Arguments
/// * `message` - 要签名的消息
/// * `secret` - 签名密钥
///
/// # Returns
/// * 十六进制格式的签名字符串
pub fn hmac_sha256_hex(message: &str, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).context("Invalid HMAC key")?;

    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// 生成随机nonce
pub fn generate_nonce(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params_of(value: Value) -> SignedParams {
        match value {
            Value::Object(map) => SignedParams::from_object(&map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_sign_matches_md5_of_prefixed_string() {
        // "a" + "b" + "c" => md5("abc")
        let params = params_of(json!({ "b": "c" }));
        assert_eq!(sign(&params, "a"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_canonical_string_sorted_without_separators() {
        let params = params_of(json!({ "pid": 1382528827416576u64, "nonce": "ibTxVG", "amount": "1.50" }));
        assert_eq!(
            params.canonical_string("key"),
            "keyamount1.50nonceibTxVGpid1382528827416576"
        );
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let params = params_of(json!({
            "order_id": "DEP1",
            "order_amount": "100.00",
            "order_currency": "USDT",
            "valid_time": 600
        }));
        let signature = sign(&params, "secret");

        assert!(verify(&params, "secret", &signature));
        assert!(verify(&params, "secret", &signature.to_uppercase()));
        assert!(!verify(&params, "other", &signature));
        assert!(!verify(&params, "secret", "deadbeef"));
    }

    #[test]
    fn test_sign_ignores_insertion_order() {
        let mut forward = SignedParams::new();
        forward.insert("a", 1);
        forward.insert("b", "x");
        forward.insert("c", true);

        let mut backward = SignedParams::new();
        backward.insert("c", true);
        backward.insert("b", "x");
        backward.insert("a", 1);

        assert_eq!(sign(&forward, "k"), sign(&backward, "k"));
    }

    #[test]
    fn test_sign_sensitive_to_names_and_values() {
        let base = params_of(json!({ "a": 1, "b": "x" }));
        let renamed = params_of(json!({ "a": 1, "c": "x" }));
        let changed = params_of(json!({ "a": 2, "b": "x" }));

        let signature = sign(&base, "k");
        assert_ne!(signature, sign(&renamed, "k"));
        assert_ne!(signature, sign(&changed, "k"));
    }

    #[test]
    fn test_empty_and_null_values_excluded() {
        let with_empty = params_of(json!({ "a": 1, "b": "", "c": null }));
        let plain = params_of(json!({ "a": 1 }));

        assert_eq!(with_empty.len(), 1);
        assert_eq!(sign(&with_empty, "k"), sign(&plain, "k"));
    }

    #[test]
    fn test_sign_field_never_signed() {
        let with_sign = params_of(json!({ "a": 1, "sign": "abc" }));
        let plain = params_of(json!({ "a": 1 }));
        assert_eq!(sign(&with_sign, "k"), sign(&plain, "k"));
    }

    #[test]
    fn test_numeric_rendering() {
        assert_eq!(canonical_value(&json!(100)).as_deref(), Some("100"));
        assert_eq!(canonical_value(&json!(-7)).as_deref(), Some("-7"));
        assert_eq!(canonical_value(&json!(100.0)).as_deref(), Some("100"));
        assert_eq!(canonical_value(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(canonical_value(&json!(false)).as_deref(), Some("false"));
        assert_eq!(canonical_value(&json!([1, "a"])).as_deref(), Some("[1,\"a\"]"));
        assert_eq!(canonical_value(&json!(null)), None);
    }

    #[test]
    fn test_integer_and_string_forms_agree() {
        let numeric = params_of(json!({ "valid_time": 600 }));
        let textual = params_of(json!({ "valid_time": "600" }));
        assert_eq!(sign(&numeric, "k"), sign(&textual, "k"));
    }

    #[test]
    fn test_attach_signature() {
        let mut body = json!({ "pid": 1, "nonce": "abc" })
            .as_object()
            .cloned()
            .unwrap();
        attach_signature(&mut body, "k");

        let signature = body.get(SIGN_FIELD).and_then(Value::as_str).unwrap().to_string();
        assert!(verify(&SignedParams::from_object(&body), "k", &signature));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("hello", "hello"));
        assert!(!constant_time_eq("hello", "world"));
        assert!(!constant_time_eq("hello", "hello world"));
    }

    #[test]
    fn test_hmac_signature() {
        let signature = hmac_sha256_hex("payload", "secret").unwrap();
        assert_eq!(signature.len(), 64);
        assert_eq!(signature, hmac_sha256_hex("payload", "secret").unwrap());
        assert_ne!(signature, hmac_sha256_hex("payload", "other").unwrap());
    }

    #[test]
    fn test_generate_nonce() {
        let nonce = generate_nonce(6);
        assert_eq!(nonce.len(), 6);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
