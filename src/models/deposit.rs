// 入金生命周期模型
// 定义内部入金状态、网关状态映射以及转发给后端的事件结构

use serde::{Deserialize, Serialize};

/// 入金状态枚举 (内部词汇，与网关无关)
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DepositStatus {
    /// 订单已创建，等待支付
    #[default]
    Pending,
    /// 已收到支付，等待确认
    Processing,
    /// 入金成功
    Approved,
    /// 已拒绝 (如订单过期)
    Rejected,
    /// 已取消
    Cancelled,
    /// 失败
    Failed,
}

impl DepositStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Processing => "processing",
            DepositStatus::Approved => "approved",
            DepositStatus::Rejected => "rejected",
            DepositStatus::Cancelled => "cancelled",
            DepositStatus::Failed => "failed",
        }
    }

    /// 检查是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DepositStatus::Approved
                | DepositStatus::Rejected
                | DepositStatus::Cancelled
                | DepositStatus::Failed
        )
    }

    /// 检查是否允许迁移到目标状态
    ///
    /// 终态不再接受任何迁移
    pub fn can_transition_to(&self, _next: DepositStatus) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 将网关状态映射为内部入金状态
///
/// 未识别的状态一律视为 pending，不会被当作终态
pub fn map_status(provider_status: &str) -> DepositStatus {
    match provider_status.trim().to_ascii_lowercase().as_str() {
        "pending" => DepositStatus::Pending,
        "paid" => DepositStatus::Processing,
        "complete" => DepositStatus::Approved,
        "expired" => DepositStatus::Rejected,
        "cancelled" => DepositStatus::Cancelled,
        "failed" => DepositStatus::Failed,
        _ => DepositStatus::Pending,
    }
}

/// 转发给后端的入金事件
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    /// 第三方订单号 (关联键)
    pub third_party_id: String,
    /// 网关订单号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cregis_id: Option<String>,
    /// 收款地址
    pub address: Option<String>,
    /// 支付金额
    pub amount: Option<String>,
    /// 支付币种
    pub currency: Option<String>,
    /// 映射后的内部状态
    pub status: DepositStatus,
    /// 网关原始状态
    pub provider_status: String,
    /// 链上交易哈希
    pub tx_hash: Option<String>,
    /// 区块确认数
    pub confirmations: Option<u64>,
    /// 区块高度
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// 创建订单成功后通知后端的待处理入金
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeposit {
    pub third_party_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cregis_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    pub amount: String,
    pub currency: String,
    pub status: DepositStatus,
    pub payment_url: String,
}
