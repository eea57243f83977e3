// 认证工具函数
// 从前端请求中提取用户令牌，转发给内部后端

use actix_web::HttpRequest;

/// 从HTTP请求中提取Bearer令牌
///
/// # Arguments
/// * `req` - HTTP请求对象
///
/// # Returns
/// * 令牌字符串 (不含 Bearer 前缀)
pub fn extract_bearer_token(req: &HttpRequest) -> Option<String> {
    let auth_header = req.headers().get("Authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
