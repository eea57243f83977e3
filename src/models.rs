// 入金网关数据模型定义
// 包含支付订单、网关回调、入金生命周期等核心数据结构

mod callback;
mod deposit;
mod payment;

// 重新导出核心类型
pub use callback::*;
pub use deposit::*;
pub use payment::*;

use serde::Serialize;

/// 成功业务码
pub const SUCCESS_CODE: &str = "00000";

/// 标准API响应格式 (与网关回调应答格式一致)
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// 业务码，"00000" 表示成功
    pub code: String,
    /// 响应消息
    pub msg: String,
    /// 响应数据
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            msg: "Success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 创建成功响应（无数据）
    pub fn success_no_data() -> Self {
        Self {
            code: SUCCESS_CODE.to_string(),
            msg: "Success".to_string(),
            data: None,
        }
    }

    /// 创建错误响应
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            msg: msg.into(),
            data: None,
        }
    }
}
