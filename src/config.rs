// 配置管理模块
// 负责加载和管理应用程序配置，启动时构建一次，运行期间只读

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use anyhow::{Result, Context};
use crate::errors::ApiError;

/// 默认订单有效时间 (分钟)
pub const DEFAULT_VALID_TIME_MINUTES: u32 = 600;

/// 应用程序配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 服务器配置
    pub server: ServerConfig,
    /// 支付网关配置
    pub gateway: GatewayConfig,
    /// 内部后端配置
    pub backend: BackendConfig,
    /// 回调处理配置
    pub callback: CallbackConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 服务器监听地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 工作线程数
    pub workers: Option<usize>,
    /// 允许跨域的源
    pub cors_allowed_origins: Vec<String>,
}

/// 支付网关配置
///
/// 凭据缺失不会阻止启动，但相关路由会直接返回配置错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 项目ID (pid)
    pub project_id: Option<String>,
    /// 下单签名密钥
    pub api_key: Option<String>,
    /// 回调验签密钥 (缺省时使用 api_key)
    pub callback_key: Option<String>,
    /// 网关基础URL
    pub base_url: Option<String>,
    /// 网关回调地址
    pub callback_url: Option<String>,
    /// 支付成功跳转地址
    pub success_url: Option<String>,
    /// 取消支付跳转地址
    pub cancel_url: Option<String>,
    /// 默认订单有效时间 (分钟)
    pub default_valid_time: u32,
    /// 请求超时时间 (秒)
    pub timeout: u64,
}

/// 下单所需的网关凭据
#[derive(Debug, Clone, Copy)]
pub struct GatewayCredentials<'a> {
    pub project_id: &'a str,
    pub api_key: &'a str,
    pub base_url: &'a str,
}

/// 内部后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 后端基础URL
    pub base_url: Option<String>,
    /// 转发载荷HMAC签名密钥
    pub secret: Option<String>,
    /// 请求超时时间 (秒)
    pub timeout: u64,
}

/// 回调处理配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// 未签名回调的处理策略
    pub signature_policy: SignaturePolicy,
}

/// 未签名回调的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SignaturePolicy {
    /// 拒绝未签名回调
    #[default]
    Strict,
    /// 放行未签名回调并记录警告 (网关测试回调可能不带签名)
    AllowUnsigned,
}

impl FromStr for SignaturePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(SignaturePolicy::Strict),
            "allow_unsigned" | "permissive" => Ok(SignaturePolicy::AllowUnsigned),
            other => anyhow::bail!("Unknown signature policy: {}", other),
        }
    }
}

impl Config {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("Invalid SERVER_PORT")?,
                workers: env::var("SERVER_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
                cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .map(|s| parse_list(&s))
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                project_id: non_empty_var("CREGIS_PROJECT_ID"),
                api_key: non_empty_var("CREGIS_API_KEY"),
                callback_key: non_empty_var("CREGIS_CALLBACK_KEY"),
                base_url: non_empty_var("CREGIS_GATEWAY_URL"),
                callback_url: non_empty_var("PAYMENT_CALLBACK_URL"),
                success_url: non_empty_var("PAYMENT_SUCCESS_URL"),
                cancel_url: non_empty_var("PAYMENT_CANCEL_URL"),
                default_valid_time: env::var("PAYMENT_VALID_TIME")
                    .unwrap_or_else(|_| DEFAULT_VALID_TIME_MINUTES.to_string())
                    .parse()
                    .context("Invalid PAYMENT_VALID_TIME")?,
                timeout: env::var("GATEWAY_TIMEOUT")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid GATEWAY_TIMEOUT")?,
            },
            backend: BackendConfig {
                base_url: non_empty_var("BACKEND_URL"),
                secret: non_empty_var("BACKEND_SECRET"),
                timeout: env::var("BACKEND_TIMEOUT")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .context("Invalid BACKEND_TIMEOUT")?,
            },
            callback: CallbackConfig {
                signature_policy: env::var("CALLBACK_SIGNATURE_POLICY")
                    .unwrap_or_else(|_| "strict".to_string())
                    .parse()
                    .context("Invalid CALLBACK_SIGNATURE_POLICY")?,
            },
        })
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.gateway.timeout == 0 || self.backend.timeout == 0 {
            anyhow::bail!("Request timeouts must be greater than 0");
        }

        if self.gateway.default_valid_time == 0 {
            anyhow::bail!("Default valid time must be greater than 0");
        }

        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl GatewayConfig {
    /// 获取下单凭据，缺失时返回配置错误而不是带空值调用网关
    pub fn credentials(&self) -> std::result::Result<GatewayCredentials<'_>, ApiError> {
        let project_id = self
            .project_id
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("CREGIS_PROJECT_ID is not configured".into()))?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("CREGIS_API_KEY is not configured".into()))?;
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| ApiError::Configuration("CREGIS_GATEWAY_URL is not configured".into()))?;

        Ok(GatewayCredentials {
            project_id,
            api_key,
            base_url: base_url.trim_end_matches('/'),
        })
    }

    /// 回调验签密钥
    pub fn callback_secret(&self) -> Option<&str> {
        self.callback_key.as_deref().or(self.api_key.as_deref())
    }

    /// 网关凭据是否完整
    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: None,
                cors_allowed_origins: Vec::new(),
            },
            gateway: GatewayConfig {
                project_id: None,
                api_key: None,
                callback_key: None,
                base_url: None,
                callback_url: None,
                success_url: None,
                cancel_url: None,
                default_valid_time: DEFAULT_VALID_TIME_MINUTES,
                timeout: 30,
            },
            backend: BackendConfig {
                base_url: None,
                secret: None,
                timeout: 8,
            },
            callback: CallbackConfig {
                signature_policy: SignaturePolicy::Strict,
            },
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_policy_parse() {
        assert_eq!("strict".parse::<SignaturePolicy>().unwrap(), SignaturePolicy::Strict);
        assert_eq!(
            "ALLOW_UNSIGNED".parse::<SignaturePolicy>().unwrap(),
            SignaturePolicy::AllowUnsigned
        );
        assert!("sometimes".parse::<SignaturePolicy>().is_err());
        assert_eq!(SignaturePolicy::default(), SignaturePolicy::Strict);
    }

    #[test]
    fn test_credentials_missing() {
        let config = Config::default();
        let err = config.gateway.credentials().unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
        assert!(!config.gateway.is_configured());
    }

    #[test]
    fn test_credentials_present() {
        let mut config = Config::default();
        config.gateway.project_id = Some("1382528827416576".into());
        config.gateway.api_key = Some("key".into());
        config.gateway.base_url = Some("https://gateway.example/".into());

        let credentials = config.gateway.credentials().unwrap();
        assert_eq!(credentials.base_url, "https://gateway.example");
        assert_eq!(config.gateway.callback_secret(), Some("key"));

        config.gateway.callback_key = Some("callback".into());
        assert_eq!(config.gateway.callback_secret(), Some("callback"));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.gateway.default_valid_time = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" https://a.example, ,https://b.example"),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
