// 网关回调处理器
// 接收支付网关的状态通知，验签后转发给内部后端

use actix_web::{web, HttpResponse};
use crate::errors::ApiError;
use crate::models::ApiResponse;
use crate::services::{CallbackService, ForwardOutcome};
use crate::state::AppState;

/// 支付网关回调
///
/// POST /api/v1/deposits/callback
///
/// 请求体: 网关签名的扁平JSON对象
/// 响应: {"code":"00000","msg":"Success"}，后端转发失败不影响应答
pub async fn payment_callback(
    data: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let service = CallbackService::new(&data.config, data.backend.clone());
    let outcome = service.handle(&body).await?;

    if let ForwardOutcome::Failed(e) = &outcome.forwarding {
        log::warn!(
            "Acknowledging callback for {} despite forwarding failure: {}",
            outcome.event.third_party_id, e
        );
    }
    log::debug!(
        "Callback for {} acknowledged (signature: {:?})",
        outcome.event.third_party_id, outcome.signature
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success_no_data()))
}
