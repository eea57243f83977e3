// 支付订单数据模型
// 定义收银台下单请求、归一化结果以及内部下单接口的数据结构

use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::models::deposit::DepositStatus;

/// 网关下单请求
///
/// 必填字段使用 Option 表示，缺失由校验逻辑处理而不是反序列化失败
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentOrderRequest {
    /// 第三方订单号 (回调中原样返回)
    pub order_id: String,
    /// 订单金额 (十进制字符串)
    pub order_amount: Option<String>,
    /// 订单币种
    pub order_currency: Option<String>,
    /// 网关回调地址
    pub callback_url: Option<String>,
    /// 支付成功跳转地址
    pub success_url: Option<String>,
    /// 取消支付跳转地址
    pub cancel_url: Option<String>,
    /// 付款人标识 (交易账号)
    pub payer_id: Option<String>,
    /// 订单有效时间 (分钟)，缺失或非法时使用默认值
    pub valid_time: Option<String>,
}

/// 归一化后的订单数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentOrderData {
    /// 网关订单号
    pub cregis_id: Option<String>,
    /// 第三方订单号
    pub order_id: String,
    /// 收银台支付链接
    pub payment_url: String,
    /// 支付二维码
    pub qr_code: Option<String>,
    /// 过期时间 (毫秒时间戳)
    pub expire_time: i64,
    /// 订单币种
    pub order_currency: Option<String>,
    /// 可选支付方式 (网关原样返回)
    #[serde(default)]
    pub payment_info: Vec<Value>,
    /// 网关订单状态 (仅查询时存在)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// 映射后的入金状态 (仅查询时存在)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_status: Option<DepositStatus>,
}

/// 网关调用结果
///
/// 只能通过 `succeeded` / `failed` 构造，保证 data 与 error 恰好一个存在
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentOrderResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PaymentOrderData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 网关返回的HTTP状态码 (仅用于诊断与透传)
    #[serde(skip)]
    pub upstream_status: Option<u16>,
}

impl PaymentOrderResult {
    /// 创建成功结果
    pub fn succeeded(data: PaymentOrderData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            upstream_status: None,
        }
    }

    /// 创建失败结果
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            upstream_status: None,
        }
    }

    /// 附加网关HTTP状态码
    pub fn with_upstream_status(mut self, status: u16) -> Self {
        self.upstream_status = Some(status);
        self
    }
}

/// 内部下单接口请求 (前端调用)
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// 入金金额
    #[serde(default)]
    pub order_amount: Value,
    /// 入金币种
    pub order_currency: Option<String>,
    /// 交易账号
    pub account_number: Option<String>,
    /// 指定链网络 (用于过滤支付方式)
    pub network: Option<String>,
}

impl CheckoutRequest {
    /// 金额既可能是字符串也可能是数字
    pub fn amount_text(&self) -> Option<String> {
        match &self.order_amount {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 内部下单接口响应数据
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub cregis_id: Option<String>,
    pub order_id: String,
    pub order_currency: Option<String>,
    pub expire_time: i64,
    pub payment_url: String,
    pub qr_code: Option<String>,
    pub payment_info: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_status: Option<DepositStatus>,
}

impl CheckoutResponse {
    /// 由归一化订单数据构建响应，指定网络时过滤支付方式
    pub fn from_order(data: PaymentOrderData, network: Option<&str>) -> Self {
        let payment_info = match network.map(str::trim).filter(|n| !n.is_empty()) {
            Some(network) => data
                .payment_info
                .into_iter()
                .filter(|info| matches_network(info, network))
                .collect(),
            None => data.payment_info,
        };

        Self {
            cregis_id: data.cregis_id,
            order_id: data.order_id,
            order_currency: data.order_currency,
            expire_time: data.expire_time,
            payment_url: data.payment_url,
            qr_code: data.qr_code,
            payment_info,
            status: data.status,
            deposit_status: data.deposit_status,
        }
    }
}

fn matches_network(info: &Value, network: &str) -> bool {
    ["blockchain", "network", "chain"]
        .iter()
        .filter_map(|key| info.get(*key).and_then(Value::as_str))
        .any(|value| value.eq_ignore_ascii_case(network))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_data() -> PaymentOrderData {
        PaymentOrderData {
            cregis_id: Some("C1".to_string()),
            order_id: "DEP1".to_string(),
            payment_url: "https://pay/x".to_string(),
            qr_code: None,
            expire_time: 1_700_000_000_000,
            order_currency: Some("USDT".to_string()),
            payment_info: vec![
                json!({ "blockchain": "TRON", "token_symbol": "USDT" }),
                json!({ "blockchain": "Ethereum", "token_symbol": "USDT" }),
            ],
            status: None,
            deposit_status: None,
        }
    }

    #[test]
    fn test_result_exactly_one_side() {
        let ok = PaymentOrderResult::succeeded(sample_data());
        assert!(ok.success && ok.data.is_some() && ok.error.is_none());

        let err = PaymentOrderResult::failed("boom").with_upstream_status(502);
        assert!(!err.success && err.data.is_none());
        assert_eq!(err.error.as_deref(), Some("boom"));
        assert_eq!(err.upstream_status, Some(502));

        let value = serde_json::to_value(&err).unwrap();
        assert!(value.get("data").is_none());
        assert!(value.get("upstream_status").is_none());
    }

    #[test]
    fn test_checkout_response_filters_network() {
        let response = CheckoutResponse::from_order(sample_data(), Some("tron"));
        assert_eq!(response.payment_info.len(), 1);
        assert_eq!(response.payment_info[0]["blockchain"], "TRON");

        let unfiltered = CheckoutResponse::from_order(sample_data(), None);
        assert_eq!(unfiltered.payment_info.len(), 2);
    }

    #[test]
    fn test_amount_text_accepts_numbers_and_strings() {
        let numeric: CheckoutRequest =
            serde_json::from_value(json!({ "order_amount": 100, "order_currency": "USDT" })).unwrap();
        assert_eq!(numeric.amount_text().as_deref(), Some("100"));

        let textual: CheckoutRequest =
            serde_json::from_value(json!({ "order_amount": " 12.50 ", "order_currency": "USDT" })).unwrap();
        assert_eq!(textual.amount_text().as_deref(), Some("12.50"));

        let missing: CheckoutRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.amount_text(), None);
    }
}
