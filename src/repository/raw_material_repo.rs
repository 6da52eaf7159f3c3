// ==========================================
// 贝类加工追溯系统 - 原料收货仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 已组批（assigned）的记录只能经由批次创建事务写入，这里不允许修改
// ==========================================

use crate::db::{format_timestamp, storage_now};
use crate::domain::raw_material::{NewRawMaterial, RawMaterial};
use crate::domain::types::RawMaterialStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query::{enum_field, timestamp_field, ListOrder, RawMaterialFilter};
use crate::repository::subscription::{ChangeHub, Collection, Subscription};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const COLUMNS: &str = "id, supplier_id, weight, date, status, lot_number, created_at, updated_at";
const DATE_FORMAT: &str = "%Y-%m-%d";

struct RawMaterialRow {
    id: String,
    supplier_id: String,
    weight: f64,
    date: String,
    status: String,
    lot_number: Option<String>,
    created_at: String,
    updated_at: String,
}

impl RawMaterialRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            supplier_id: row.get(1)?,
            weight: row.get(2)?,
            date: row.get(3)?,
            status: row.get(4)?,
            lot_number: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<RawMaterial> {
        let date = NaiveDate::parse_from_str(&self.date, DATE_FORMAT)
            .map_err(|e| RepositoryError::bad_field("date", format!("{} ({})", e, self.date)))?;
        Ok(RawMaterial {
            status: enum_field("status", &self.status, RawMaterialStatus::from_db_str)?,
            created_at: timestamp_field("created_at", &self.created_at)?,
            updated_at: timestamp_field("updated_at", &self.updated_at)?,
            id: self.id,
            supplier_id: self.supplier_id,
            weight: self.weight,
            date,
            lot_number: self.lot_number,
        })
    }
}

/// 原料记录可修改字段（仅 pending 状态允许）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMaterialPatch {
    pub supplier_id: Option<String>,
    pub weight: Option<f64>,
    pub date: Option<NaiveDate>,
}

impl RawMaterialPatch {
    fn is_empty(&self) -> bool {
        self.supplier_id.is_none() && self.weight.is_none() && self.date.is_none()
    }
}

// ==========================================
// RawMaterialRepository
// ==========================================
pub struct RawMaterialRepository {
    conn: Arc<Mutex<Connection>>,
    hub: Arc<ChangeHub>,
}

impl RawMaterialRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, hub: Arc<ChangeHub>) -> Self {
        Self { conn, hub }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub(crate) fn query_list(
        conn: &Connection,
        filter: &RawMaterialFilter,
        order: ListOrder,
    ) -> RepositoryResult<Vec<RawMaterial>> {
        let clause = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM raw_materials {} {}",
            COLUMNS,
            clause.sql(),
            order.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.params.iter()), RawMaterialRow::read)?;
        rows.map(|r| r.map_err(RepositoryError::from).and_then(RawMaterialRow::into_domain))
            .collect()
    }

    pub(crate) fn query_by_id(conn: &Connection, id: &str) -> RepositoryResult<Option<RawMaterial>> {
        let sql = format!("SELECT {} FROM raw_materials WHERE id = ?1", COLUMNS);
        let row = conn.query_row(&sql, params![id], RawMaterialRow::read).optional()?;
        row.map(RawMaterialRow::into_domain).transpose()
    }

    /// 登记收货（status=pending）
    pub fn insert(&self, new_material: &NewRawMaterial) -> RepositoryResult<RawMaterial> {
        let now = storage_now();
        let material = RawMaterial {
            id: Uuid::new_v4().to_string(),
            supplier_id: new_material.supplier_id.clone(),
            weight: new_material.weight,
            date: new_material.date,
            status: RawMaterialStatus::Pending,
            lot_number: None,
            created_at: now,
            updated_at: now,
        };
        {
            let conn = self.get_conn()?;
            conn.execute(
                "INSERT INTO raw_materials (id, supplier_id, weight, date, status, lot_number, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
                params![
                    material.id,
                    material.supplier_id,
                    material.weight,
                    material.date.format(DATE_FORMAT).to_string(),
                    material.status.to_db_str(),
                    format_timestamp(material.created_at),
                    format_timestamp(material.updated_at),
                ],
            )?;
        }
        self.hub.publish(Collection::RawMaterials);
        Ok(material)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<RawMaterial>> {
        let conn = self.get_conn()?;
        Self::query_by_id(&conn, id)
    }

    /// 按 id 批量读取，保持入参顺序
    ///
    /// # 返回
    /// - 任一 id 不存在时返回 NotFound
    pub fn find_by_ids(&self, ids: &[String]) -> RepositoryResult<Vec<RawMaterial>> {
        let conn = self.get_conn()?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match Self::query_by_id(&conn, id)? {
                Some(m) => out.push(m),
                None => return Err(RepositoryError::not_found("RawMaterial", id)),
            }
        }
        Ok(out)
    }

    pub fn list(&self, filter: &RawMaterialFilter, order: ListOrder) -> RepositoryResult<Vec<RawMaterial>> {
        let conn = self.get_conn()?;
        Self::query_list(&conn, filter, order)
    }

    /// 修改尚未组批的收货记录
    pub fn update(&self, id: &str, patch: &RawMaterialPatch) -> RepositoryResult<RawMaterial> {
        let updated = {
            let conn = self.get_conn()?;
            let current = Self::query_by_id(&conn, id)?
                .ok_or_else(|| RepositoryError::not_found("RawMaterial", id))?;
            if current.status != RawMaterialStatus::Pending {
                return Err(RepositoryError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: "modified".to_string(),
                });
            }
            if patch.is_empty() {
                return Ok(current);
            }

            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(supplier_id) = &patch.supplier_id {
                values.push(Value::Text(supplier_id.clone()));
                sets.push(format!("supplier_id = ?{}", values.len()));
            }
            if let Some(weight) = patch.weight {
                values.push(Value::Real(weight));
                sets.push(format!("weight = ?{}", values.len()));
            }
            if let Some(date) = patch.date {
                values.push(Value::Text(date.format(DATE_FORMAT).to_string()));
                sets.push(format!("date = ?{}", values.len()));
            }
            values.push(Value::Text(format_timestamp(storage_now())));
            sets.push(format!("updated_at = ?{}", values.len()));
            values.push(Value::Text(id.to_string()));
            let sql = format!(
                "UPDATE raw_materials SET {} WHERE id = ?{} AND status = 'pending'",
                sets.join(", "),
                values.len()
            );
            conn.execute(&sql, params_from_iter(values.iter()))?;

            Self::query_by_id(&conn, id)?
                .ok_or_else(|| RepositoryError::not_found("RawMaterial", id))?
        };
        self.hub.publish(Collection::RawMaterials);
        Ok(updated)
    }

    /// 删除尚未组批的收货记录
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        {
            let conn = self.get_conn()?;
            let current = Self::query_by_id(&conn, id)?
                .ok_or_else(|| RepositoryError::not_found("RawMaterial", id))?;
            if current.status != RawMaterialStatus::Pending {
                return Err(RepositoryError::InvalidStateTransition {
                    from: current.status.to_string(),
                    to: "deleted".to_string(),
                });
            }
            conn.execute(
                "DELETE FROM raw_materials WHERE id = ?1 AND status = 'pending'",
                params![id],
            )?;
        }
        self.hub.publish(Collection::RawMaterials);
        Ok(())
    }

    /// 实时订阅（最新在前）
    pub fn subscribe(&self, filter: RawMaterialFilter) -> RepositoryResult<Subscription<RawMaterial>> {
        let conn = self.conn.clone();
        self.hub.register(Collection::RawMaterials, move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            Self::query_list(&guard, &filter, ListOrder::NewestFirst)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};

    fn setup() -> (RawMaterialRepository, String) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO suppliers VALUES ('sup-1', 'Supplier', 'c', 'L-1', '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        (
            RawMaterialRepository::new(Arc::new(Mutex::new(conn)), ChangeHub::shared()),
            "sup-1".to_string(),
        )
    }

    fn receipt(supplier_id: &str, weight: f64) -> NewRawMaterial {
        NewRawMaterial {
            supplier_id: supplier_id.to_string(),
            weight,
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        }
    }

    #[test]
    fn test_insert_is_pending() {
        let (repo, sup) = setup();
        let m = repo.insert(&receipt(&sup, 12.5)).unwrap();
        assert_eq!(m.status, RawMaterialStatus::Pending);
        let found = repo.find_by_id(&m.id).unwrap().unwrap();
        assert_eq!(found.date, NaiveDate::from_ymd_opt(2024, 5, 17).unwrap());
        assert_eq!(found.lot_number, None);
    }

    #[test]
    fn test_unknown_supplier_rejected_by_foreign_key() {
        let (repo, _) = setup();
        let err = repo.insert(&receipt("missing", 1.0)).unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }

    #[test]
    fn test_find_by_ids_keeps_order_and_reports_missing() {
        let (repo, sup) = setup();
        let a = repo.insert(&receipt(&sup, 1.0)).unwrap();
        let b = repo.insert(&receipt(&sup, 2.0)).unwrap();
        let got = repo.find_by_ids(&[b.id.clone(), a.id.clone()]).unwrap();
        assert_eq!(got[0].id, b.id);
        assert_eq!(got[1].id, a.id);

        let err = repo.find_by_ids(&[a.id, "ghost".to_string()]).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_update_patch_and_missing() {
        let (repo, sup) = setup();
        let m = repo.insert(&receipt(&sup, 1.0)).unwrap();
        let patch = RawMaterialPatch {
            weight: Some(4.25),
            ..Default::default()
        };
        let updated = repo.update(&m.id, &patch).unwrap();
        assert_eq!(updated.weight, 4.25);

        let err = repo.update("ghost", &patch).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_list_pending_filter() {
        let (repo, sup) = setup();
        repo.insert(&receipt(&sup, 1.0)).unwrap();
        repo.insert(&receipt(&sup, 2.0)).unwrap();
        let pending = repo
            .list(&RawMaterialFilter::pending(), ListOrder::OldestFirst)
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].weight, 1.0);
    }
}
