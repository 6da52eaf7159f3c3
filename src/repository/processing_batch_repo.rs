// ==========================================
// 贝类加工追溯系统 - 加工批仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 事务: 加工批写入与批次状态 -> processing 在同一事务内提交
// 约束: 每个批次最多一个加工批（lot_number 唯一）
// ==========================================

use crate::db::{format_timestamp, storage_now};
use crate::domain::processing::{NewProcessingBatch, PackagingQc, PackedBox, ProcessingBatch};
use crate::domain::types::{BatchStatus, LotStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query::{enum_field, timestamp_field, ListOrder, ProcessingBatchFilter};
use crate::repository::subscription::{ChangeHub, Collection, Subscription};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const COLUMNS: &str = "id, lot_number, shell_on_weight, meat_weight, shell_weight, boxes_json, \
                       yield_percentage, status, packaging_qc_json, created_at, updated_at";

struct BatchRow {
    id: String,
    lot_number: String,
    shell_on_weight: f64,
    meat_weight: f64,
    shell_weight: f64,
    boxes_json: String,
    yield_percentage: f64,
    status: String,
    packaging_qc_json: Option<String>,
    created_at: String,
    updated_at: String,
}

impl BatchRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lot_number: row.get(1)?,
            shell_on_weight: row.get(2)?,
            meat_weight: row.get(3)?,
            shell_weight: row.get(4)?,
            boxes_json: row.get(5)?,
            yield_percentage: row.get(6)?,
            status: row.get(7)?,
            packaging_qc_json: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<ProcessingBatch> {
        let boxes: Vec<PackedBox> = serde_json::from_str(&self.boxes_json)?;
        let packaging_qc = match self.packaging_qc_json.as_deref() {
            Some(raw) => Some(serde_json::from_str::<PackagingQc>(raw)?),
            None => None,
        };
        Ok(ProcessingBatch {
            status: enum_field("status", &self.status, BatchStatus::from_db_str)?,
            created_at: timestamp_field("created_at", &self.created_at)?,
            updated_at: timestamp_field("updated_at", &self.updated_at)?,
            id: self.id,
            lot_number: self.lot_number,
            shell_on_weight: self.shell_on_weight,
            meat_weight: self.meat_weight,
            shell_weight: self.shell_weight,
            boxes,
            yield_percentage: self.yield_percentage,
            packaging_qc,
        })
    }
}

// ==========================================
// ProcessingBatchRepository
// ==========================================
pub struct ProcessingBatchRepository {
    conn: Arc<Mutex<Connection>>,
    hub: Arc<ChangeHub>,
}

impl ProcessingBatchRepository {
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
        filter: &ProcessingBatchFilter,
        order: ListOrder,
    ) -> RepositoryResult<Vec<ProcessingBatch>> {
        let clause = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM processing_batches {} {}",
            COLUMNS,
            clause.sql(),
            order.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.params.iter()), BatchRow::read)?;
        rows.map(|r| r.map_err(RepositoryError::from).and_then(BatchRow::into_domain))
            .collect()
    }

    fn query_one(conn: &Connection, column: &str, value: &str) -> RepositoryResult<Option<ProcessingBatch>> {
        let sql = format!("SELECT {} FROM processing_batches WHERE {} = ?1", COLUMNS, column);
        let row = conn.query_row(&sql, params![value], BatchRow::read).optional()?;
        row.map(BatchRow::into_domain).transpose()
    }

    /// 写入加工批并把批次置为 processing（单事务）
    ///
    /// # 返回
    /// - Err(NotFound): 批次不存在
    /// - Err(UniqueConstraintViolation): 该批次已有加工批
    pub fn insert_and_mark_lot_processing(
        &self,
        new_batch: &NewProcessingBatch,
    ) -> RepositoryResult<ProcessingBatch> {
        let now = storage_now();
        let batch = ProcessingBatch {
            id: Uuid::new_v4().to_string(),
            lot_number: new_batch.lot_number.clone(),
            shell_on_weight: new_batch.shell_on_weight,
            meat_weight: new_batch.meat_weight,
            shell_weight: new_batch.shell_weight,
            boxes: new_batch.boxes.clone(),
            yield_percentage: new_batch.yield_percentage,
            status: new_batch.status,
            packaging_qc: None,
            created_at: now,
            updated_at: now,
        };

        {
            let conn = self.get_conn()?;
            let tx = conn.unchecked_transaction()?;
            let stamp = format_timestamp(now);

            let lot_updated = tx.execute(
                "UPDATE lots SET status = ?1, updated_at = ?2 WHERE lot_number = ?3",
                params![LotStatus::Processing.to_db_str(), stamp, batch.lot_number],
            )?;
            if lot_updated == 0 {
                return Err(RepositoryError::not_found("Lot", &batch.lot_number));
            }

            tx.execute(
                "INSERT INTO processing_batches (id, lot_number, shell_on_weight, meat_weight, shell_weight,
                                                 boxes_json, yield_percentage, status, packaging_qc_json,
                                                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?10)",
                params![
                    batch.id,
                    batch.lot_number,
                    batch.shell_on_weight,
                    batch.meat_weight,
                    batch.shell_weight,
                    serde_json::to_string(&batch.boxes)?,
                    batch.yield_percentage,
                    batch.status.to_db_str(),
                    stamp,
                    stamp,
                ],
            )?;

            tx.commit()
                .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        }

        self.hub.publish(Collection::ProcessingBatches);
        self.hub.publish(Collection::Lots);
        Ok(batch)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProcessingBatch>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "id", id)
    }

    pub fn find_by_lot_number(&self, lot_number: &str) -> RepositoryResult<Option<ProcessingBatch>> {
        let conn = self.get_conn()?;
        Self::query_one(&conn, "lot_number", lot_number)
    }

    pub fn list(
        &self,
        filter: &ProcessingBatchFilter,
        order: ListOrder,
    ) -> RepositoryResult<Vec<ProcessingBatch>> {
        let conn = self.get_conn()?;
        Self::query_list(&conn, filter, order)
    }

    /// 写入（或替换）包装质检记录
    pub fn update_packaging_qc(&self, id: &str, qc: &PackagingQc) -> RepositoryResult<ProcessingBatch> {
        let updated = {
            let conn = self.get_conn()?;
            let affected = conn.execute(
                "UPDATE processing_batches SET packaging_qc_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![serde_json::to_string(qc)?, format_timestamp(storage_now()), id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::not_found("ProcessingBatch", id));
            }
            Self::query_one(&conn, "id", id)?
                .ok_or_else(|| RepositoryError::not_found("ProcessingBatch", id))?
        };
        self.hub.publish(Collection::ProcessingBatches);
        Ok(updated)
    }

    /// 修改加工批状态
    pub fn update_status(&self, id: &str, status: BatchStatus) -> RepositoryResult<ProcessingBatch> {
        let updated = {
            let conn = self.get_conn()?;
            let affected = conn.execute(
                "UPDATE processing_batches SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.to_db_str(), format_timestamp(storage_now()), id],
            )?;
            if affected == 0 {
                return Err(RepositoryError::not_found("ProcessingBatch", id));
            }
            Self::query_one(&conn, "id", id)?
                .ok_or_else(|| RepositoryError::not_found("ProcessingBatch", id))?
        };
        self.hub.publish(Collection::ProcessingBatches);
        Ok(updated)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let affected = {
            let conn = self.get_conn()?;
            conn.execute("DELETE FROM processing_batches WHERE id = ?1", params![id])?
        };
        if affected == 0 {
            return Err(RepositoryError::not_found("ProcessingBatch", id));
        }
        self.hub.publish(Collection::ProcessingBatches);
        Ok(())
    }

    /// 实时订阅（最新在前）
    pub fn subscribe(&self, filter: ProcessingBatchFilter) -> RepositoryResult<Subscription<ProcessingBatch>> {
        let conn = self.conn.clone();
        self.hub.register(Collection::ProcessingBatches, move || {
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
    use chrono::Utc;
    use crate::domain::processing::{QcCheckResult, QcCriterion};
    use crate::domain::types::ProductType;

    const TS: &str = "2024-05-17T08:00:00.000000Z";

    fn setup() -> (ProcessingBatchRepository, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO lots (id, lot_number, total_weight, status, notes, depuration_status,
                               depuration_json, receipt_ids_json, created_at, updated_at)
             VALUES ('lot-1', 'L1', 10.0, 'pending', NULL, 'completed', NULL, '[]', ?1, ?1)",
            params![TS],
        )
        .unwrap();
        let conn = Arc::new(Mutex::new(conn));
        (ProcessingBatchRepository::new(conn.clone(), ChangeHub::shared()), conn)
    }

    fn new_batch(lot_number: &str) -> NewProcessingBatch {
        NewProcessingBatch {
            lot_number: lot_number.to_string(),
            shell_on_weight: 5.0,
            meat_weight: 3.0,
            shell_weight: 1.0,
            boxes: vec![
                PackedBox {
                    box_type: ProductType::ShellOn,
                    weight: 5.0,
                    box_number: "SO000001".to_string(),
                    grade: "A".to_string(),
                },
                PackedBox {
                    box_type: ProductType::Meat,
                    weight: 3.0,
                    box_number: "CM000002".to_string(),
                    grade: "A".to_string(),
                },
            ],
            yield_percentage: 80.0,
            status: BatchStatus::Completed,
        }
    }

    fn lot_status(conn: &Arc<Mutex<Connection>>) -> String {
        conn.lock()
            .unwrap()
            .query_row("SELECT status FROM lots WHERE lot_number = 'L1'", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_marks_lot_processing() {
        let (repo, conn) = setup();
        let batch = repo.insert_and_mark_lot_processing(&new_batch("L1")).unwrap();
        assert_eq!(lot_status(&conn), "processing");

        let stored = repo.find_by_lot_number("L1").unwrap().unwrap();
        assert_eq!(stored.id, batch.id);
        assert_eq!(stored.boxes.len(), 2);
        assert!(stored.packaging_qc.is_none());
    }

    #[test]
    fn test_second_batch_for_lot_is_rejected_and_rolled_back() {
        let (repo, conn) = setup();
        repo.insert_and_mark_lot_processing(&new_batch("L1")).unwrap();
        conn.lock()
            .unwrap()
            .execute("UPDATE lots SET status = 'pending' WHERE lot_number = 'L1'", [])
            .unwrap();

        let err = repo.insert_and_mark_lot_processing(&new_batch("L1")).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
        // 状态回写随事务回滚
        assert_eq!(lot_status(&conn), "pending");
    }

    #[test]
    fn test_missing_lot_is_not_found() {
        let (repo, _) = setup();
        let err = repo.insert_and_mark_lot_processing(&new_batch("L404")).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_update_packaging_qc_replaces_record() {
        let (repo, _) = setup();
        let batch = repo.insert_and_mark_lot_processing(&new_batch("L1")).unwrap();
        let qc = PackagingQc {
            checklist: QcCriterion::ALL
                .iter()
                .map(|c| QcCheckResult {
                    criterion: *c,
                    passed: true,
                    notes: String::new(),
                })
                .collect(),
            inspected_boxes: vec!["SO000001".to_string()],
            passed: true,
            completed_at: Utc::now(),
        };
        let updated = repo.update_packaging_qc(&batch.id, &qc).unwrap();
        assert_eq!(updated.packaging_qc.as_ref().unwrap().inspected_boxes, vec!["SO000001"]);

        let err = repo.update_packaging_qc("ghost", &qc).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[test]
    fn test_subscription_filtered_by_lot() {
        let (repo, _) = setup();
        let mut sub = repo.subscribe(ProcessingBatchFilter::by_lot("L1")).unwrap();
        let other = repo.subscribe(ProcessingBatchFilter::by_lot("L2")).unwrap();
        repo.insert_and_mark_lot_processing(&new_batch("L1")).unwrap();
        assert_eq!(sub.latest().len(), 1);
        assert!(other.current().is_empty());
    }
}
