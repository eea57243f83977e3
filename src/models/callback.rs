// 网关回调数据模型
// 回调是扁平的JSON对象，不同网关版本对同一字段使用不同名称，这里统一提取

use serde_json::{Map, Value};
use crate::models::deposit::{map_status, DepositEvent};
use crate::utils::signature::{canonical_value, SignedParams, SIGN_FIELD};

const THIRD_PARTY_ID_KEYS: &[&str] = &["third_party_id", "order_id", "thirdPartyId"];
const CREGIS_ID_KEYS: &[&str] = &["cregis_id", "cregisId"];
const AMOUNT_KEYS: &[&str] = &["amount", "pay_amount", "order_amount"];
const CURRENCY_KEYS: &[&str] = &["currency", "pay_currency", "order_currency"];
const ADDRESS_KEYS: &[&str] = &["address", "payment_address", "receive_address"];
const TX_HASH_KEYS: &[&str] = &["tx_hash", "tx_id", "txHash"];
const CONFIRMATION_KEYS: &[&str] = &["confirmations", "confirm_count"];
const BLOCK_HEIGHT_KEYS: &[&str] = &["block_height", "blockHeight"];

/// 回调中 sign 字段的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackSignature<'a> {
    /// 没有 sign 字段
    Absent,
    /// 非空字符串签名
    Present(&'a str),
    /// 有 sign 字段但不是非空字符串
    Malformed,
}

/// 网关回调载荷
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackPayload {
    fields: Map<String, Value>,
}

impl CallbackPayload {
    /// 从请求体解析回调载荷，请求体必须是JSON对象
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        let fields = serde_json::from_slice::<Map<String, Value>>(body)?;
        Ok(Self { fields })
    }

    /// 网关提供的签名
    ///
    /// 只有完全缺少 sign 字段才算未签名，非字符串或空白值视为无效签名
    pub fn signature(&self) -> CallbackSignature<'_> {
        match self.fields.get(SIGN_FIELD) {
            None => CallbackSignature::Absent,
            Some(Value::String(s)) if !s.trim().is_empty() => CallbackSignature::Present(s),
            Some(_) => CallbackSignature::Malformed,
        }
    }

    /// 参与验签的参数 (sign 字段已排除)
    pub fn signed_params(&self) -> SignedParams {
        SignedParams::from_object(&self.fields)
    }

    /// 网关原始状态，缺失时为空字符串
    pub fn provider_status(&self) -> String {
        self.text(&["status"]).unwrap_or_default()
    }

    pub fn third_party_id(&self) -> Option<String> {
        self.text(THIRD_PARTY_ID_KEYS)
    }

    /// 构建转发给后端的入金事件
    pub fn to_event(&self) -> DepositEvent {
        let provider_status = self.provider_status();

        DepositEvent {
            third_party_id: self.third_party_id().unwrap_or_default(),
            cregis_id: self.text(CREGIS_ID_KEYS),
            address: self.text(ADDRESS_KEYS),
            amount: self.text(AMOUNT_KEYS),
            currency: self.text(CURRENCY_KEYS),
            status: map_status(&provider_status),
            provider_status,
            tx_hash: self.text(TX_HASH_KEYS),
            confirmations: self.unsigned(CONFIRMATION_KEYS),
            block_height: self.unsigned(BLOCK_HEIGHT_KEYS),
        }
    }

    /// 按别名顺序取第一个非空字段，数字按签名规则转为字符串
    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(|value| match value {
                Value::Array(_) | Value::Object(_) => None,
                scalar => canonical_value(scalar),
            })
    }

    fn unsigned(&self, keys: &[&str]) -> Option<u64> {
        keys.iter()
            .filter_map(|key| self.fields.get(*key))
            .find_map(|value| match value {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
    }
}
