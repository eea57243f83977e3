// 健康检查API处理器

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::Serialize;
use crate::state::AppState;

/// 系统健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 服务状态
    pub status: String,
    /// 版本信息
    pub version: String,
    /// 网关凭据是否完整
    pub gateway_configured: bool,
    /// 后端地址是否配置
    pub backend_configured: bool,
    /// 当前时间戳
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 基础健康检查
///
/// GET /health
///
/// 无需认证，凭据缺失时状态为 degraded 但仍返回200
pub async fn health_check(data: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let gateway_configured = data.config.gateway.is_configured();
    let backend_configured = data.backend.is_configured();

    let status = if gateway_configured && backend_configured {
        "healthy"
    } else {
        "degraded"
    };

    Ok(HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway_configured,
        backend_configured,
        timestamp: chrono::Utc::now(),
    }))
}
