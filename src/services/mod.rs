// 业务服务层
// 包含支付网关客户端、后端通知、回调处理等核心业务逻辑

pub mod backend_client;
pub mod callback_service;
pub mod cregis_client;

// 重新导出服务
pub use backend_client::{BackendClient, ForwardOutcome};
pub use callback_service::CallbackService;
pub use cregis_client::CregisClient;
