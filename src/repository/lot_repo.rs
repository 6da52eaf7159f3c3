// ==========================================
// 贝类加工追溯系统 - 批次仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 事务: 批次创建与原料状态回写在同一事务内提交
// ==========================================

use crate::db::{format_timestamp, storage_now};
use crate::domain::lot::{DepurationData, Lot, NewLot};
use crate::domain::types::{DepurationStatus, LotStatus, RawMaterialStatus};
use crate::engine::identifiers::disambiguate_lot_number;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query::{enum_field, timestamp_field, ListOrder, LotFilter};
use crate::repository::subscription::{ChangeHub, Collection, Subscription};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 同一基础批次号最多尝试的后缀数
const MAX_LOT_NUMBER_ATTEMPTS: u32 = 100;

const COLUMNS: &str = "id, lot_number, total_weight, status, notes, depuration_json, receipt_ids_json, created_at, updated_at";

struct LotRow {
    id: String,
    lot_number: String,
    total_weight: f64,
    status: String,
    notes: Option<String>,
    depuration_json: Option<String>,
    receipt_ids_json: String,
    created_at: String,
    updated_at: String,
}

impl LotRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lot_number: row.get(1)?,
            total_weight: row.get(2)?,
            status: row.get(3)?,
            notes: row.get(4)?,
            depuration_json: row.get(5)?,
            receipt_ids_json: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<Lot> {
        let depuration_data = match self.depuration_json.as_deref() {
            Some(raw) => Some(serde_json::from_str::<DepurationData>(raw)?),
            None => None,
        };
        Ok(Lot {
            status: enum_field("status", &self.status, LotStatus::from_db_str)?,
            receipt_ids: serde_json::from_str(&self.receipt_ids_json)?,
            created_at: timestamp_field("created_at", &self.created_at)?,
            updated_at: timestamp_field("updated_at", &self.updated_at)?,
            id: self.id,
            lot_number: self.lot_number,
            total_weight: self.total_weight,
            notes: self.notes,
            depuration_data,
        })
    }
}

/// 批次可修改字段
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotPatch {
    pub status: Option<LotStatus>,
    /// Some(None) 表示清空备注
    pub notes: Option<Option<String>>,
}

// ==========================================
// LotRepository
// ==========================================
pub struct LotRepository {
    conn: Arc<Mutex<Connection>>,
    hub: Arc<ChangeHub>,
}

impl LotRepository {
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
        filter: &LotFilter,
        order: ListOrder,
    ) -> RepositoryResult<Vec<Lot>> {
        let clause = filter.where_clause();
        let sql = format!("SELECT {} FROM lots {} {}", COLUMNS, clause.sql(), order.sql());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.params.iter()), LotRow::read)?;
        rows.map(|r| r.map_err(RepositoryError::from).and_then(LotRow::into_domain))
            .collect()
    }

    fn query_one(conn: &Connection, column: &str, value: &str) -> RepositoryResult<Option<Lot>> {
        let sql = format!("SELECT {} FROM lots WHERE {} = ?1", COLUMNS, column);
        let row = conn.query_row(&sql, params![value], LotRow::read).optional()?;
        row.map(LotRow::into_domain).transpose()
    }

    pub(crate) fn query_by_lot_number(conn: &Connection, lot_number: &str) -> RepositoryResult<Option<Lot>> {
        Self::query_one(conn, "lot_number", lot_number)
    }

    /// 同一分钟内已被占用的批次号依次加后缀 -2、-3…
    fn free_lot_number(conn: &Connection, base: &str) -> RepositoryResult<String> {
        for attempt in 1..=MAX_LOT_NUMBER_ATTEMPTS {
            let candidate = disambiguate_lot_number(base, attempt);
            let taken: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM lots WHERE lot_number = ?1",
                    params![candidate],
                    |row| row.get(0),
                )
                .optional()?;
            if taken.is_none() {
                return Ok(candidate);
            }
        }
        Err(RepositoryError::UniqueConstraintViolation(format!(
            "lots.lot_number: {} (已尝试 {} 次)",
            base, MAX_LOT_NUMBER_ATTEMPTS
        )))
    }

    /// 创建批次并将所选原料标记为已组批（单事务）
    ///
    /// # 参数
    /// - new_lot: 待写入批次（receipt_ids 已去重；lot_number 为基础批次号）
    ///
    /// # 返回
    /// - Ok(Lot): 已提交的批次（批次号可能带冲突后缀）
    /// - Err(NotFound / InvalidStateTransition): 某条原料不存在或已不是 pending，整体回滚
    pub fn insert_with_assignments(&self, new_lot: &NewLot) -> RepositoryResult<Lot> {
        let now = storage_now();
        let mut lot = Lot {
            id: Uuid::new_v4().to_string(),
            lot_number: new_lot.lot_number.clone(),
            total_weight: new_lot.total_weight,
            status: LotStatus::Pending,
            notes: new_lot.notes.clone(),
            depuration_data: None,
            receipt_ids: new_lot.receipt_ids.clone(),
            created_at: now,
            updated_at: now,
        };

        {
            let conn = self.get_conn()?;
            let tx = conn.unchecked_transaction()?;

            lot.lot_number = Self::free_lot_number(&tx, &new_lot.lot_number)?;

            let stamp = format_timestamp(now);
            tx.execute(
                "INSERT INTO lots (id, lot_number, total_weight, status, notes, depuration_status,
                                   depuration_json, receipt_ids_json, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, ?6, ?7, ?8)",
                params![
                    lot.id,
                    lot.lot_number,
                    lot.total_weight,
                    lot.status.to_db_str(),
                    lot.notes,
                    serde_json::to_string(&lot.receipt_ids)?,
                    stamp,
                    stamp,
                ],
            )?;

            for receipt_id in &lot.receipt_ids {
                let affected = tx.execute(
                    "UPDATE raw_materials SET status = ?1, lot_number = ?2, updated_at = ?3
                     WHERE id = ?4 AND status = ?5",
                    params![
                        RawMaterialStatus::Assigned.to_db_str(),
                        lot.lot_number,
                        stamp,
                        receipt_id,
                        RawMaterialStatus::Pending.to_db_str(),
                    ],
                )?;
                if affected == 0 {
                    let status: Option<String> = tx
                        .query_row(
                            "SELECT status FROM raw_materials WHERE id = ?1",
                            params![receipt_id],
                            |row| row.get(0),
                        )
                        .optional()?;
                    // tx 未提交即 drop，自动回滚
                    return Err(match status {
                        None => RepositoryError::not_found("RawMaterial", receipt_id),
                        Some(from) => RepositoryError::InvalidStateTransition {
                            from,
                            to: RawMaterialStatus::Assigned.to_db_str().to_string(),
                        },
                    });
                }
            }

            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        }

        self.hub.publish(Collection::Lots);
        self.hub.publish(Collection::RawMaterials);
        Ok(lot)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Lot>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "id", id)
    }

    pub fn find_by_lot_number(&self, lot_number: &str) -> RepositoryResult<Option<Lot>> {
        let conn = self.get_conn()?;
        Self::query_by_lot_number(&conn, lot_number)
    }

    pub fn list(&self, filter: &LotFilter, order: ListOrder) -> RepositoryResult<Vec<Lot>> {
        let conn = self.get_conn()?;
        Self::query_list(&conn, filter, order)
    }

    /// 写入净化记录（比较并交换）
    ///
    /// # 参数
    /// - lot_number: 批次号
    /// - expected: 写入前应处于的净化状态（None 表示尚无记录）
    /// - data: 新的净化记录
    ///
    /// # 返回
    /// - Err(InvalidStateTransition): 读取后状态已被并发修改
    pub fn update_depuration(
        &self,
        lot_number: &str,
        expected: Option<DepurationStatus>,
        data: &DepurationData,
    ) -> RepositoryResult<Lot> {
        let updated = {
            let conn = self.get_conn()?;
            let affected = conn.execute(
                "UPDATE lots SET depuration_status = ?1, depuration_json = ?2, updated_at = ?3
                 WHERE lot_number = ?4 AND depuration_status IS ?5",
                params![
                    data.status.to_db_str(),
                    serde_json::to_string(data)?,
                    format_timestamp(storage_now()),
                    lot_number,
                    expected.map(|s| s.to_db_str()),
                ],
            )?;
            let current = Self::query_by_lot_number(&conn, lot_number)?
                .ok_or_else(|| RepositoryError::not_found("Lot", lot_number))?;
            if affected == 0 {
                return Err(RepositoryError::InvalidStateTransition {
                    from: current
                        .depuration_status()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "absent".to_string()),
                    to: data.status.to_string(),
                });
            }
            current
        };
        self.hub.publish(Collection::Lots);
        Ok(updated)
    }

    /// 按字段修改批次
    pub fn update(&self, id: &str, patch: &LotPatch) -> RepositoryResult<Lot> {
        let updated = {
            let conn = self.get_conn()?;
            let mut sets: Vec<String> = Vec::new();
            let mut values: Vec<Value> = Vec::new();
            if let Some(status) = patch.status {
                values.push(Value::Text(status.to_db_str().to_string()));
                sets.push(format!("status = ?{}", values.len()));
            }
            if let Some(notes) = &patch.notes {
                values.push(match notes {
                    Some(text) => Value::Text(text.clone()),
                    None => Value::Null,
                });
                sets.push(format!("notes = ?{}", values.len()));
            }
            values.push(Value::Text(format_timestamp(storage_now())));
            sets.push(format!("updated_at = ?{}", values.len()));
            values.push(Value::Text(id.to_string()));
            let sql = format!(
                "UPDATE lots SET {} WHERE id = ?{}",
                sets.join(", "),
                values.len()
            );
            let affected = conn.execute(&sql, params_from_iter(values.iter()))?;
            if affected == 0 {
                return Err(RepositoryError::not_found("Lot", id));
            }
            Self::query_one(&conn, "id", id)?.ok_or_else(|| RepositoryError::not_found("Lot", id))?
        };
        self.hub.publish(Collection::Lots);
        Ok(updated)
    }

    /// 删除批次
    ///
    /// 已组批的原料不可回退为 pending，仍有原料挂在该批次下时拒绝删除；
    /// 已有加工批的批次由外键拒绝删除
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        {
            let conn = self.get_conn()?;
            let lot = Self::query_one(&conn, "id", id)?
                .ok_or_else(|| RepositoryError::not_found("Lot", id))?;
            let assigned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM raw_materials WHERE lot_number = ?1",
                params![lot.lot_number],
                |row| row.get(0),
            )?;
            if assigned > 0 {
                return Err(RepositoryError::InvalidStateTransition {
                    from: format!("{} ({} receipts)", lot.status.to_db_str(), assigned),
                    to: "deleted".to_string(),
                });
            }
            conn.execute("DELETE FROM lots WHERE id = ?1", params![id])?;
        }
        self.hub.publish(Collection::Lots);
        Ok(())
    }

    /// 实时订阅（最新在前）
    pub fn subscribe(&self, filter: LotFilter) -> RepositoryResult<Subscription<Lot>> {
        let conn = self.conn.clone();
        self.hub.register(Collection::Lots, move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            Self::query_list(&guard, &filter, ListOrder::NewestFirst)
        })
    }
}
