// 支付网关客户端
// 负责向网关创建收银台订单、查询订单，并将网关多变的响应格式归一化为内部结构

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{json, Map, Value};
use crate::config::{GatewayConfig, GatewayCredentials};
use crate::errors::ApiError;
use crate::models::{
    map_status, PaymentOrderData, PaymentOrderRequest, PaymentOrderResult, SUCCESS_CODE,
};
use crate::utils::signature::{attach_signature, canonical_value, generate_nonce};
use crate::utils::{generate_payment_qr_code, validate_order_request, ValidatedOrder};

const CHECKOUT_PATH: &str = "/api/v2/checkout";
const QUERY_PATH: &str = "/api/v2/checkout/query";
const NONCE_LENGTH: usize = 6;

const CREGIS_ID_KEYS: &[&str] = &["cregis_id", "cregisId", "id"];
const ORDER_ID_KEYS: &[&str] = &["order_id", "orderId", "third_party_id"];
const PAYMENT_URL_KEYS: &[&str] = &["payment_url", "paymentUrl", "checkout_url"];
const QR_CODE_KEYS: &[&str] = &["qr_code", "qrCode"];
const EXPIRE_TIME_KEYS: &[&str] = &["expire_time", "expireTime", "expired_at"];
const CURRENCY_KEYS: &[&str] = &["order_currency", "orderCurrency", "currency"];
const STATUS_KEYS: &[&str] = &["status", "order_status"];

/// 支付网关客户端
#[derive(Clone)]
pub struct CregisClient {
    client: Client,
    config: GatewayConfig,
}

impl CregisClient {
    /// 创建新的网关客户端
    ///
    /// # Arguments
    /// * `config` - 网关配置
    ///
    /// # Returns
    /// * 网关客户端实例
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent("DepositGateway/1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// 创建收银台订单
    ///
    /// 校验失败与配置缺失在调用网关之前返回 Err；
    /// 网关侧的任何失败都以 `success: false` 的结果返回
    ///
    /// # Arguments
    /// * `request` - 下单请求
    ///
    /// # Returns
    /// * 归一化的下单结果
    pub async fn create_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> std::result::Result<PaymentOrderResult, ApiError> {
        let order = validate_order_request(request, self.config.default_valid_time)
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let credentials = self.config.credentials()?;

        let body = build_checkout_body(
            &credentials,
            &order,
            &generate_nonce(NONCE_LENGTH),
            Utc::now().timestamp_millis(),
        );
        let url = format!("{}{}", credentials.base_url, CHECKOUT_PATH);

        let response = match self.post_signed(&url, &body).await {
            Ok(response) => response,
            Err(failure) => {
                log::warn!(
                    "Checkout creation failed for order {}: {}",
                    order.order_id,
                    failure.error.as_deref().unwrap_or_default()
                );
                return Ok(failure);
            }
        };

        let now = Utc::now();
        match normalize_order(&response, &order.order_id, order.valid_time, now) {
            Ok(data) => {
                log::info!(
                    "Created checkout order {} (cregis id: {})",
                    data.order_id,
                    data.cregis_id.as_deref().unwrap_or("-")
                );
                Ok(PaymentOrderResult::succeeded(with_qr_fallback(data)))
            }
            Err(reason) => {
                log::warn!("Unexpected checkout response for order {}: {}", order.order_id, reason);
                Ok(PaymentOrderResult::failed(reason))
            }
        }
    }

    /// 查询收银台订单 (webhook 丢失或延迟时轮询使用)
    ///
    /// # Arguments
    /// * `cregis_id` - 网关订单号
    ///
    /// # Returns
    /// * 归一化的订单结果，包含网关状态与映射后的入金状态
    pub async fn query_order(
        &self,
        cregis_id: &str,
    ) -> std::result::Result<PaymentOrderResult, ApiError> {
        let cregis_id = cregis_id.trim();
        if cregis_id.is_empty() {
            return Err(ApiError::Validation("cregis_id: This field is required".into()));
        }
        let credentials = self.config.credentials()?;

        let mut body = base_body(
            &credentials,
            &generate_nonce(NONCE_LENGTH),
            Utc::now().timestamp_millis(),
        );
        body.insert("cregis_id".into(), json!(cregis_id));
        attach_signature(&mut body, credentials.api_key);

        let url = format!("{}{}", credentials.base_url, QUERY_PATH);
        let response = match self.post_signed(&url, &body).await {
            Ok(response) => response,
            Err(failure) => {
                log::warn!(
                    "Checkout query failed for {}: {}",
                    cregis_id,
                    failure.error.as_deref().unwrap_or_default()
                );
                return Ok(failure);
            }
        };

        let mut data = match normalize_order(&response, "", self.config.default_valid_time, Utc::now()) {
            Ok(data) => data,
            Err(reason) => return Ok(PaymentOrderResult::failed(reason)),
        };

        if data.cregis_id.is_none() {
            data.cregis_id = Some(cregis_id.to_string());
        }
        data.status = pick_text(payload_of(&response), STATUS_KEYS);
        data.deposit_status = Some(map_status(data.status.as_deref().unwrap_or_default()));

        Ok(PaymentOrderResult::succeeded(data))
    }

    /// 发送已签名请求并检查网关业务码
    ///
    /// 失败时返回已经构造好的失败结果，网关原始响应原样保留
    async fn post_signed(
        &self,
        url: &str,
        body: &Map<String, Value>,
    ) -> std::result::Result<Value, PaymentOrderResult> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentOrderResult::failed("Gateway request timed out")
                } else {
                    PaymentOrderResult::failed(format!("Gateway request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            PaymentOrderResult::failed(format!("Failed to read gateway response: {}", e))
                .with_upstream_status(status.as_u16())
        })?;

        if !status.is_success() {
            log::error!("Gateway returned {}: {}", status, text);
            return Err(PaymentOrderResult::failed(format!(
                "Gateway returned {}: {}",
                status.as_u16(),
                text
            ))
            .with_upstream_status(status.as_u16()));
        }

        let value: Value = serde_json::from_str(&text).map_err(|_| {
            PaymentOrderResult::failed(format!("Malformed gateway response: {}", text))
                .with_upstream_status(status.as_u16())
        })?;

        if let Some(code) = value.get("code").and_then(canonical_value) {
            if code != SUCCESS_CODE {
                let message = value
                    .get("msg")
                    .and_then(canonical_value)
                    .unwrap_or_else(|| text.clone());
                return Err(PaymentOrderResult::failed(format!(
                    "Gateway rejected request ({}): {}",
                    code, message
                ))
                .with_upstream_status(status.as_u16()));
            }
        }

        Ok(value)
    }
}

/// 构建带签名的下单请求体
pub fn build_checkout_body(
    credentials: &GatewayCredentials<'_>,
    order: &ValidatedOrder,
    nonce: &str,
    timestamp: i64,
) -> Map<String, Value> {
    let mut body = base_body(credentials, nonce, timestamp);
    body.insert("order_id".into(), json!(order.order_id));
    body.insert("order_amount".into(), json!(order.order_amount));
    body.insert("order_currency".into(), json!(order.order_currency));
    body.insert("callback_url".into(), json!(order.callback_url));
    body.insert("success_url".into(), json!(order.success_url));
    body.insert("cancel_url".into(), json!(order.cancel_url));
    if let Some(payer_id) = &order.payer_id {
        body.insert("payer_id".into(), json!(payer_id));
    }
    body.insert("valid_time".into(), json!(order.valid_time));

    attach_signature(&mut body, credentials.api_key);
    body
}

fn base_body(credentials: &GatewayCredentials<'_>, nonce: &str, timestamp: i64) -> Map<String, Value> {
    let pid = credentials
        .project_id
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(credentials.project_id));

    let mut body = Map::new();
    body.insert("pid".into(), pid);
    body.insert("nonce".into(), json!(nonce));
    body.insert("timestamp".into(), json!(timestamp));
    body
}

/// 将网关响应归一化为内部订单数据
///
/// 响应既可能是 `{code, msg, data}` 信封，也可能直接是订单对象
///
/// # Arguments
/// * `response` - 网关响应JSON
/// * `fallback_order_id` - 网关未返回订单号时使用的第三方订单号
/// * `valid_time` - 有效时间 (分钟)，用于推算缺失的过期时间
/// * `now` - 当前时间
pub fn normalize_order(
    response: &Value,
    fallback_order_id: &str,
    valid_time: u32,
    now: DateTime<Utc>,
) -> std::result::Result<PaymentOrderData, String> {
    let payload = payload_of(response);
    if !payload.is_object() {
        return Err(format!("Malformed gateway response: {}", response));
    }

    let payment_url = pick_text(payload, PAYMENT_URL_KEYS)
        .ok_or_else(|| format!("Gateway response missing payment url: {}", response))?;

    let expire_time = EXPIRE_TIME_KEYS
        .iter()
        .filter_map(|key| payload.get(*key))
        .find_map(parse_expire_time)
        .unwrap_or_else(|| now.timestamp_millis() + i64::from(valid_time) * 60_000);

    Ok(PaymentOrderData {
        cregis_id: pick_text(payload, CREGIS_ID_KEYS),
        order_id: pick_text(payload, ORDER_ID_KEYS)
            .unwrap_or_else(|| fallback_order_id.to_string()),
        payment_url,
        qr_code: pick_text(payload, QR_CODE_KEYS),
        expire_time,
        order_currency: pick_text(payload, CURRENCY_KEYS),
        payment_info: payload
            .get("payment_info")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        status: None,
        deposit_status: None,
    })
}

fn payload_of(response: &Value) -> &Value {
    match response.get("data") {
        Some(data) if data.is_object() => data,
        _ => response,
    }
}

fn pick_text(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find_map(|value| match value {
            Value::String(_) | Value::Number(_) => canonical_value(value),
            _ => None,
        })
}

/// 解析过期时间，支持毫秒/秒时间戳以及RFC3339字符串
fn parse_expire_time(value: &Value) -> Option<i64> {
    let millis = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok().or_else(|| {
            DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|dt| dt.timestamp_millis())
        }),
        _ => None,
    }?;

    // 小于 10^12 视为秒级时间戳
    if millis > 0 && millis < 1_000_000_000_000 {
        Some(millis * 1000)
    } else if millis > 0 {
        Some(millis)
    } else {
        None
    }
}

fn with_qr_fallback(mut data: PaymentOrderData) -> PaymentOrderData {
    if data.qr_code.is_none() {
        data.qr_code = match generate_payment_qr_code(&data.payment_url) {
            Ok(qr) => Some(qr),
            Err(e) => {
                log::warn!("Failed to generate QR code for {}: {}", data.order_id, e);
                None
            }
        };
    }
    data
}
