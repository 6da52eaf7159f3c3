// ==========================================
// 贝类加工追溯系统 - 查询条件
// ==========================================
// 约束: 只允许等值过滤 + created_at 排序，全部参数化
// ==========================================

use crate::db::parse_timestamp;
use crate::domain::types::{DepurationStatus, LotStatus, ProductType, RawMaterialStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;

/// 排序方向（按 created_at，同一时间戳按写入顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl ListOrder {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            ListOrder::NewestFirst => "ORDER BY created_at DESC, rowid DESC",
            ListOrder::OldestFirst => "ORDER BY created_at ASC, rowid ASC",
        }
    }
}

/// 原料记录过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMaterialFilter {
    pub status: Option<RawMaterialStatus>,
    pub supplier_id: Option<String>,
    pub lot_number: Option<String>,
}

impl RawMaterialFilter {
    pub fn pending() -> Self {
        Self {
            status: Some(RawMaterialStatus::Pending),
            ..Self::default()
        }
    }

    pub fn by_lot(lot_number: &str) -> Self {
        Self {
            lot_number: Some(lot_number.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn where_clause(&self) -> WhereClause {
        let mut w = WhereClause::default();
        if let Some(status) = self.status {
            w.eq("status", status.to_db_str());
        }
        if let Some(supplier_id) = &self.supplier_id {
            w.eq("supplier_id", supplier_id);
        }
        if let Some(lot_number) = &self.lot_number {
            w.eq("lot_number", lot_number);
        }
        w
    }
}

/// 批次过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub depuration_status: Option<DepurationStatus>,
}

impl LotFilter {
    /// 净化已完成的批次（可进入加工）
    pub fn depurated() -> Self {
        Self {
            status: None,
            depuration_status: Some(DepurationStatus::Completed),
        }
    }

    pub(crate) fn where_clause(&self) -> WhereClause {
        let mut w = WhereClause::default();
        if let Some(status) = self.status {
            w.eq("status", status.to_db_str());
        }
        if let Some(dep) = self.depuration_status {
            w.eq("depuration_status", dep.to_db_str());
        }
        w
    }
}

/// 加工批过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingBatchFilter {
    pub lot_number: Option<String>,
}

impl ProcessingBatchFilter {
    pub fn by_lot(lot_number: &str) -> Self {
        Self {
            lot_number: Some(lot_number.to_string()),
        }
    }

    pub(crate) fn where_clause(&self) -> WhereClause {
        let mut w = WhereClause::default();
        if let Some(lot_number) = &self.lot_number {
            w.eq("lot_number", lot_number);
        }
        w
    }
}

/// 产品等级过滤条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductGradeFilter {
    pub product_type: Option<ProductType>,
}

impl ProductGradeFilter {
    pub(crate) fn where_clause(&self) -> WhereClause {
        let mut w = WhereClause::default();
        if let Some(pt) = self.product_type {
            w.eq("product_type", pt.to_db_str());
        }
        w
    }
}

// ==========================================
// WHERE 子句构造
// ==========================================
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    conditions: Vec<String>,
    pub(crate) params: Vec<Value>,
}

impl WhereClause {
    fn eq(&mut self, column: &'static str, value: &str) {
        self.params.push(Value::Text(value.to_string()));
        self.conditions.push(format!("{} = ?{}", column, self.params.len()));
    }

    pub(crate) fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }
}

// ==========================================
// 行映射辅助
// ==========================================

pub(crate) fn timestamp_field(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    parse_timestamp(raw).map_err(|e| RepositoryError::bad_field(field, format!("{} ({})", e, raw)))
}

pub(crate) fn enum_field<T>(field: &str, raw: &str, parse: fn(&str) -> Option<T>) -> RepositoryResult<T> {
    parse(raw).ok_or_else(|| RepositoryError::bad_field(field, format!("无法识别的值: {}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_has_no_where() {
        let w = LotFilter::default().where_clause();
        assert_eq!(w.sql(), "");
        assert!(w.params.is_empty());
    }

    #[test]
    fn test_filter_numbers_placeholders_in_order() {
        let filter = RawMaterialFilter {
            status: Some(RawMaterialStatus::Pending),
            supplier_id: Some("s1".to_string()),
            lot_number: None,
        };
        let w = filter.where_clause();
        assert_eq!(w.sql(), "WHERE status = ?1 AND supplier_id = ?2");
        assert_eq!(w.params.len(), 2);
    }

    #[test]
    fn test_enum_field_rejects_unknown() {
        let err = enum_field("status", "shipped", LotStatus::from_db_str).unwrap_err();
        assert!(matches!(err, RepositoryError::FieldValueError { .. }));
    }
}
