// CORS中间件配置
// 允许前端收银台页面跨域调用下单与查询接口

use actix_cors::Cors;
use actix_web::http::header;

/// 创建CORS中间件
///
/// 未配置 CORS_ALLOWED_ORIGINS 时仅放行本地开发源
///
/// # Arguments
/// * `allowed_origins` - 允许的源列表
pub fn create_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-request-id"),
        ])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .max_age(3600);

    if allowed_origins.is_empty() {
        cors = cors.allowed_origin_fn(|origin, _req_head| is_local_origin(origin.as_bytes()));
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn is_local_origin(origin: &[u8]) -> bool {
    origin.starts_with(b"http://localhost")
        || origin.starts_with(b"https://localhost")
        || origin.starts_with(b"http://127.0.0.1")
        || origin.starts_with(b"https://127.0.0.1")
}
