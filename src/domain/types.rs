// ==========================================
// 贝类加工追溯系统 - 领域类型定义
// ==========================================
// 职责: 追溯链路上各实体的状态枚举
// 序列化格式: kebab-case（与存储及前端字段值一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 原料状态 (Raw Material Status)
// ==========================================
// 红线: 一旦 assigned 即不可再变更
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RawMaterialStatus {
    Pending,  // 待组批
    Assigned, // 已组批
}

impl RawMaterialStatus {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RawMaterialStatus::Pending => "pending",
            RawMaterialStatus::Assigned => "assigned",
        }
    }

    /// 从数据库字符串解析（未知值返回 None，由仓储层报错）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RawMaterialStatus::Pending),
            "assigned" => Some(RawMaterialStatus::Assigned),
            _ => None,
        }
    }
}

impl fmt::Display for RawMaterialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 批次状态 (Lot Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LotStatus {
    Pending,    // 已组批，未加工
    Processing, // 已提交加工
    Completed,  // 已完结
}

impl LotStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LotStatus::Pending => "pending",
            LotStatus::Processing => "processing",
            LotStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LotStatus::Pending),
            "processing" => Some(LotStatus::Processing),
            "completed" => Some(LotStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 净化状态 (Depuration Status)
// ==========================================
// 状态机: (absent|pending) -> in-progress -> completed（终态）
// 只有 completed 解锁加工
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepurationStatus {
    Pending,    // 已登记未开始
    InProgress, // 净化中
    Completed,  // 净化完成
}

impl DepurationStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            DepurationStatus::Pending => "pending",
            DepurationStatus::InProgress => "in-progress",
            DepurationStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DepurationStatus::Pending),
            "in-progress" => Some(DepurationStatus::InProgress),
            "completed" => Some(DepurationStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for DepurationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 产品类型 (Product Type)
// ==========================================
// 同时用于装箱类型与等级参考数据的过滤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    ShellOn, // 带壳
    Meat,    // 肉
}

impl ProductType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductType::ShellOn => "shell-on",
            ProductType::Meat => "meat",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "shell-on" => Some(ProductType::ShellOn),
            "meat" => Some(ProductType::Meat),
            _ => None,
        }
    }

    /// 箱号前缀: 带壳 SO, 肉 CM
    pub fn box_prefix(&self) -> &'static str {
        match self {
            ProductType::ShellOn => "SO",
            ProductType::Meat => "CM",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 加工批状态 (Processing Batch Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchStatus {
    Pending,
    Completed,
}

impl BatchStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BatchStatus::Pending),
            "completed" => Some(BatchStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
