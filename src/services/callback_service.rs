// 网关回调处理服务
// 单次回调的处理流程: 接收 -> 验签 -> 状态映射 -> 转发后端 -> 应答
// 流程不跨请求保存任何状态，重复或乱序回调由后端幂等处理

use crate::config::{Config, SignaturePolicy};
use crate::errors::ApiError;
use crate::models::{CallbackPayload, CallbackSignature, DepositEvent, DepositStatus};
use crate::services::backend_client::{BackendClient, ForwardOutcome, ForwardingError};
use crate::utils::signature::verify;

/// 验签结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// 签名有效
    Verified,
    /// 未携带签名，按宽松策略放行
    Unsigned,
}

/// 回调处理结果
#[derive(Debug)]
pub struct CallbackOutcome {
    pub signature: SignatureCheck,
    pub event: DepositEvent,
    /// 转发结果，不影响对网关的应答
    pub forwarding: ForwardOutcome,
}

/// 回调处理服务
pub struct CallbackService {
    backend: BackendClient,
    callback_secret: Option<String>,
    policy: SignaturePolicy,
}

impl CallbackService {
    /// 创建回调处理服务
    ///
    /// # Arguments
    /// * `config` - 应用配置
    /// * `backend` - 后端客户端
    pub fn new(config: &Config, backend: BackendClient) -> Self {
        Self {
            backend,
            callback_secret: config.gateway.callback_secret().map(str::to_string),
            policy: config.callback.signature_policy,
        }
    }

    /// 处理一次网关回调
    ///
    /// # Arguments
    /// * `body` - 原始请求体
    ///
    /// # Returns
    /// * 处理结果；请求体无法解析、验签失败或缺少密钥时返回错误且不会转发
    pub async fn handle(&self, body: &[u8]) -> Result<CallbackOutcome, ApiError> {
        let payload = CallbackPayload::parse(body).map_err(|e| {
            log::error!("Unparsable gateway callback: {}", e);
            ApiError::Internal(format!("Invalid callback body: {}", e))
        })?;

        let signature = self.check_signature(&payload)?;

        let event = payload.to_event();
        if event.status.is_terminal() {
            log::info!(
                "Gateway callback for {}: {} -> {} (final)",
                event.third_party_id, event.provider_status, event.status
            );
        } else {
            log::debug!(
                "Gateway callback for {}: {} -> {}",
                event.third_party_id, event.provider_status, event.status
            );
        }

        // 第三方订单号是后端唯一的关联键，缺失时不转发
        let forwarding = if event.third_party_id.is_empty() {
            log::warn!(
                "Gateway callback (cregis id: {}) has no third party id, not forwarding",
                event.cregis_id.as_deref().unwrap_or("-")
            );
            ForwardOutcome::Failed(ForwardingError::MissingThirdPartyId)
        } else {
            let forwarding = self.backend.notify_deposit(&event).await;
            if event.status == DepositStatus::Approved {
                self.backend.dispatch_deposit_email(&event);
            }
            forwarding
        };

        Ok(CallbackOutcome {
            signature,
            event,
            forwarding,
        })
    }

    fn check_signature(&self, payload: &CallbackPayload) -> Result<SignatureCheck, ApiError> {
        let received = match payload.signature() {
            CallbackSignature::Present(received) => received,
            CallbackSignature::Malformed => {
                log::warn!("Malformed sign field on gateway callback for {:?}", payload.third_party_id());
                return Err(ApiError::Signature("malformed sign field".into()));
            }
            CallbackSignature::Absent => return match self.policy {
                SignaturePolicy::AllowUnsigned => {
                    log::warn!(
                        "Accepting unsigned gateway callback for {:?} (signature policy: allow_unsigned)",
                        payload.third_party_id()
                    );
                    Ok(SignatureCheck::Unsigned)
                }
                SignaturePolicy::Strict => {
                    log::warn!("Rejected unsigned gateway callback for {:?}", payload.third_party_id());
                    Err(ApiError::Signature("missing sign field".into()))
                }
            },
        };

        let secret = self.callback_secret.as_deref().ok_or_else(|| {
            ApiError::Configuration("CREGIS_CALLBACK_KEY / CREGIS_API_KEY is not configured".into())
        })?;

        if verify(&payload.signed_params(), secret, received) {
            Ok(SignatureCheck::Verified)
        } else {
            log::warn!("Invalid signature on gateway callback for {:?}", payload.third_party_id());
            Err(ApiError::Signature("sign mismatch".into()))
        }
    }
}
