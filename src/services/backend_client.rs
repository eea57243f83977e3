// 内部后端通知客户端
// 将入金事件转发给后端，转发属于尽力而为的副作用，结果单独返回并记录日志

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;
use crate::config::BackendConfig;
use crate::models::{DepositEvent, PendingDeposit};
use crate::utils::signature::hmac_sha256_hex;

const DEPOSIT_CALLBACK_PATH: &str = "/api/deposits/callback";
const PENDING_DEPOSIT_PATH: &str = "/api/deposits/pending";
const DEPOSIT_EMAIL_PATH: &str = "/api/notifications/deposit";

/// 转发失败原因
#[derive(Error, Debug)]
pub enum ForwardingError {
    #[error("Backend URL is not configured")]
    NotConfigured,

    #[error("Backend request timed out")]
    Timeout,

    #[error("Backend request failed: {0}")]
    Transport(String),

    #[error("Backend returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Failed to prepare backend payload: {0}")]
    Payload(String),

    #[error("Deposit event has no third party id")]
    MissingThirdPartyId,
}

/// 转发结果
#[derive(Debug)]
pub enum ForwardOutcome {
    /// 后端已接收
    Delivered,
    /// 转发失败 (不影响对网关的应答)
    Failed(ForwardingError),
}

impl ForwardOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ForwardOutcome::Delivered)
    }
}

impl From<std::result::Result<(), ForwardingError>> for ForwardOutcome {
    fn from(result: std::result::Result<(), ForwardingError>) -> Self {
        match result {
            Ok(()) => ForwardOutcome::Delivered,
            Err(e) => ForwardOutcome::Failed(e),
        }
    }
}

/// 内部后端客户端
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// 创建新的后端客户端
    ///
    /// # Arguments
    /// * `config` - 后端配置
    ///
    /// # Returns
    /// * 后端客户端实例
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent("DepositGateway/1.0")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// 是否配置了后端地址
    pub fn is_configured(&self) -> bool {
        self.config.base_url.is_some()
    }

    /// 转发网关回调产生的入金事件
    ///
    /// # Arguments
    /// * `event` - 归一化的入金事件
    ///
    /// # Returns
    /// * 转发结果
    pub async fn notify_deposit(&self, event: &DepositEvent) -> ForwardOutcome {
        let outcome: ForwardOutcome = self.post_json(DEPOSIT_CALLBACK_PATH, event, None).await.into();

        match &outcome {
            ForwardOutcome::Delivered => log::info!(
                "Forwarded deposit event {} ({}) to backend",
                event.third_party_id, event.status
            ),
            ForwardOutcome::Failed(e) => log::error!(
                "Failed to forward deposit event {} ({}): {}",
                event.third_party_id, event.status, e
            ),
        }

        outcome
    }

    /// 通知后端新建的待处理入金
    ///
    /// # Arguments
    /// * `deposit` - 待处理入金
    /// * `bearer_token` - 前端用户令牌 (原样转发)
    pub async fn notify_pending_deposit(
        &self,
        deposit: &PendingDeposit,
        bearer_token: Option<&str>,
    ) -> ForwardOutcome {
        let outcome: ForwardOutcome = self
            .post_json(PENDING_DEPOSIT_PATH, deposit, bearer_token)
            .await
            .into();

        if let ForwardOutcome::Failed(e) = &outcome {
            log::warn!(
                "Failed to record pending deposit {} in backend: {}",
                deposit.third_party_id, e
            );
        }

        outcome
    }

    /// 请求后端发送入金成功邮件
    ///
    /// 在后台任务中执行，不等待结果，失败只记录日志
    pub fn dispatch_deposit_email(&self, event: &DepositEvent) {
        let backend = self.clone();
        let payload = json!({
            "template": "deposit_approved",
            "thirdPartyId": event.third_party_id,
            "amount": event.amount,
            "currency": event.currency,
            "txHash": event.tx_hash,
        });
        let third_party_id = event.third_party_id.clone();

        tokio::spawn(async move {
            if let Err(e) = backend.post_json(DEPOSIT_EMAIL_PATH, &payload, None).await {
                log::warn!("Deposit email dispatch failed for {}: {}", third_party_id, e);
            }
        });
    }

    /// 发送JSON请求，配置了密钥时附带HMAC签名
    async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        bearer_token: Option<&str>,
    ) -> std::result::Result<(), ForwardingError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .ok_or(ForwardingError::NotConfigured)?;
        let url = format!("{}{}", base_url.trim_end_matches('/'), path);

        let body = serde_json::to_string(payload)
            .map_err(|e| ForwardingError::Payload(e.to_string()))?;

        let request_id = Uuid::new_v4().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-request-id",
            HeaderValue::from_str(&request_id).map_err(|e| ForwardingError::Payload(e.to_string()))?,
        );

        if let Some(secret) = &self.config.secret {
            let signature = hmac_sha256_hex(&body, secret)
                .map_err(|e| ForwardingError::Payload(e.to_string()))?;
            headers.insert(
                "x-gateway-signature",
                HeaderValue::from_str(&signature).map_err(|e| ForwardingError::Payload(e.to_string()))?,
            );
        }

        if let Some(token) = bearer_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ForwardingError::Payload(e.to_string()))?,
            );
        }

        let start_time = Instant::now();
        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ForwardingError::Timeout
                } else {
                    ForwardingError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        log::debug!(
            "Backend {} responded {} in {}ms (request id {})",
            path,
            status.as_u16(),
            start_time.elapsed().as_millis(),
            request_id
        );

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ForwardingError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
