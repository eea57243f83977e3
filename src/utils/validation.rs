// 数据验证工具函数
// 提供下单请求校验、URL与金额格式检查功能

use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Result;
use reqwest::Url;
use rust_decimal::Decimal;
use crate::models::PaymentOrderRequest;

/// 校验通过的下单请求
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub order_id: String,
    /// 金额原文 (保留调用方的精度写法，用于签名与请求体)
    pub order_amount: String,
    pub order_currency: String,
    pub callback_url: String,
    pub success_url: String,
    pub cancel_url: String,
    pub payer_id: Option<String>,
    /// 有效时间 (分钟)
    pub valid_time: u32,
}

/// 验证URL格式 (必须是http/https绝对地址)
///
/// # Arguments
/// * `url` - URL字符串
///
/// # Returns
/// * URL是否有效
pub fn validate_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// 解析正数金额
///
/// # Arguments
/// * `amount` - 金额字符串
///
/// # Returns
/// * 解析后的金额，非数字或不大于零时返回 None
pub fn parse_positive_amount(amount: &str) -> Option<Decimal> {
    Decimal::from_str(amount.trim())
        .ok()
        .filter(|value| *value > Decimal::ZERO)
}

/// 解析有效时间，缺失、非数字或不为正时使用默认值
pub fn resolve_valid_time(raw: Option<&str>, default_minutes: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|minutes| *minutes > 0)
        .unwrap_or(default_minutes)
}

/// 校验下单请求并应用默认值
///
/// # Arguments
/// * `request` - 下单请求
/// * `default_valid_time` - 默认有效时间 (分钟)
///
/// # Returns
/// * 校验通过的请求，失败时返回汇总的错误信息
pub fn validate_order_request(
    request: &PaymentOrderRequest,
    default_valid_time: u32,
) -> Result<ValidatedOrder> {
    let mut validator = InputValidator::new();

    let order_amount = validator.require("order_amount", request.order_amount.as_deref());
    let order_currency = validator.require("order_currency", request.order_currency.as_deref());
    let callback_url = validator.require("callback_url", request.callback_url.as_deref());
    let success_url = validator.require("success_url", request.success_url.as_deref());
    let cancel_url = validator.require("cancel_url", request.cancel_url.as_deref());

    if let Some(text) = order_amount.as_deref() {
        if parse_positive_amount(text).is_none() {
            validator.add_error("order_amount", "Must be a positive number");
        }
    }

    for (field, url) in [
        ("callback_url", &callback_url),
        ("success_url", &success_url),
        ("cancel_url", &cancel_url),
    ] {
        if let Some(url) = url {
            validator.validate_url_field(field, url);
        }
    }

    validator.validate_required("order_id", &request.order_id);
    validator.into_result()?;

    // 校验通过后上述字段必然存在
    match (order_amount, order_currency, callback_url, success_url, cancel_url) {
        (
            Some(order_amount),
            Some(order_currency),
            Some(callback_url),
            Some(success_url),
            Some(cancel_url),
        ) => Ok(ValidatedOrder {
            order_id: request.order_id.trim().to_string(),
            order_amount,
            order_currency,
            callback_url,
            success_url,
            cancel_url,
            payer_id: request
                .payer_id
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            valid_time: resolve_valid_time(request.valid_time.as_deref(), default_valid_time),
        }),
        _ => anyhow::bail!("Validation failed: incomplete order request"),
    }
}

/// 通用输入验证器
pub struct InputValidator {
    errors: BTreeMap<String, Vec<String>>,
}

impl InputValidator {
    /// 创建新的验证器
    pub fn new() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }

    /// 添加字段验证错误
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    /// 验证必填字段
    pub fn validate_required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add_error(field, "This field is required");
        }
    }

    /// 验证必填字段并返回去除空白后的值
    pub fn require(&mut self, field: &str, value: Option<&str>) -> Option<String> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v.to_string()),
            None => {
                self.add_error(field, "This field is required");
                None
            }
        }
    }

    /// 验证URL格式
    pub fn validate_url_field(&mut self, field: &str, url: &str) {
        if !validate_url(url) {
            self.add_error(field, "Invalid URL format");
        }
    }

    /// 检查是否有验证错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 获取验证错误
    pub fn get_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// 转换为错误结果
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            let error_msg = self.errors
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; ");

            anyhow::bail!("{}", error_msg);
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
