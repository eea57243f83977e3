// API路由配置
// 定义所有HTTP接口的路由规则

use actix_web::{web, Scope};
use crate::errors::ApiError;
use crate::handlers::*;

/// API v1路由配置
pub fn api_v1_routes() -> Scope {
    web::scope("/api/v1")
        // JSON解析失败统一返回校验错误信封
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            ApiError::Validation(err.to_string()).into()
        }))
        .service(deposit_routes())
}

/// 入金路由
fn deposit_routes() -> Scope {
    web::scope("/deposits")
        .route("/checkout", web::post().to(create_checkout))
        .route("/checkout/{cregis_id}", web::get().to(get_checkout))
        .route("/callback", web::post().to(payment_callback))
}

/// 公共路由 (无需认证)
pub fn public_routes() -> Scope {
    web::scope("")
        .route("/health", web::get().to(health_check))
}
