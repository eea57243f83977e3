// 应用状态管理
// 启动时构建一次的只读状态：配置与网关/后端客户端

use anyhow::Result;
use crate::config::Config;
use crate::services::{BackendClient, CregisClient};

/// 应用全局状态
pub struct AppState {
    /// 应用配置
    pub config: Config,
    /// 支付网关客户端
    pub gateway: CregisClient,
    /// 内部后端客户端
    pub backend: BackendClient,
}

impl AppState {
    /// 创建新的应用状态实例
    ///
    /// # Arguments
    /// * `config` - 应用配置
    ///
    /// # Returns
    /// * 应用状态实例
    pub fn new(config: Config) -> Result<Self> {
        let gateway = CregisClient::new(config.gateway.clone())?;
        let backend = BackendClient::new(config.backend.clone())?;

        Ok(Self {
            config,
            gateway,
            backend,
        })
    }

    /// 创建测试用的应用状态
    #[cfg(test)]
    pub fn new_for_test(gateway_url: Option<String>, backend_url: Option<String>) -> Self {
        let mut config = Config::default();
        config.gateway.project_id = Some("1382528827416576".to_string());
        config.gateway.api_key = Some("test_api_key".to_string());
        config.gateway.callback_key = Some("test_callback_key".to_string());
        config.gateway.base_url = gateway_url;
        config.gateway.callback_url = Some("https://crm.example/api/v1/deposits/callback".to_string());
        config.gateway.success_url = Some("https://crm.example/deposit/success".to_string());
        config.gateway.cancel_url = Some("https://crm.example/deposit/cancel".to_string());
        config.gateway.timeout = 5;
        config.backend.base_url = backend_url;
        config.backend.timeout = 5;

        Self::new(config).expect("Failed to build test state")
    }
}
