// ==========================================
// 贝类加工追溯系统 - 供应商仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::db::{format_timestamp, storage_now};
use crate::domain::supplier::{NewSupplier, Supplier};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query::{timestamp_field, ListOrder};
use crate::repository::subscription::{ChangeHub, Collection, Subscription};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const COLUMNS: &str = "id, name, contact, license_number, created_at, updated_at";

struct SupplierRow {
    id: String,
    name: String,
    contact: String,
    license_number: String,
    created_at: String,
    updated_at: String,
}

impl SupplierRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            contact: row.get(2)?,
            license_number: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<Supplier> {
        Ok(Supplier {
            created_at: timestamp_field("created_at", &self.created_at)?,
            updated_at: timestamp_field("updated_at", &self.updated_at)?,
            id: self.id,
            name: self.name,
            contact: self.contact,
            license_number: self.license_number,
        })
    }
}

// ==========================================
// SupplierRepository
// ==========================================
pub struct SupplierRepository {
    conn: Arc<Mutex<Connection>>,
    hub: Arc<ChangeHub>,
}

impl SupplierRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, hub: Arc<ChangeHub>) -> Self {
        Self { conn, hub }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_list(conn: &Connection, order: ListOrder) -> RepositoryResult<Vec<Supplier>> {
        let sql = format!("SELECT {} FROM suppliers {}", COLUMNS, order.sql());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], SupplierRow::read)?;
        rows.map(|r| r.map_err(RepositoryError::from).and_then(SupplierRow::into_domain))
            .collect()
    }

    /// 新增供应商（id 与时间戳由仓储生成）
    pub fn insert(&self, new_supplier: &NewSupplier) -> RepositoryResult<Supplier> {
        let now = storage_now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: new_supplier.name.clone(),
            contact: new_supplier.contact.clone(),
            license_number: new_supplier.license_number.clone(),
            created_at: now,
            updated_at: now,
        };
        {
            let conn = self.get_conn()?;
            conn.execute(
                "INSERT INTO suppliers (id, name, contact, license_number, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    supplier.id,
                    supplier.name,
                    supplier.contact,
                    supplier.license_number,
                    format_timestamp(supplier.created_at),
                    format_timestamp(supplier.updated_at),
                ],
            )?;
        }
        self.hub.publish(Collection::Suppliers);
        Ok(supplier)
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Supplier>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM suppliers WHERE id = ?1", COLUMNS);
        let row = conn.query_row(&sql, params![id], SupplierRow::read).optional()?;
        row.map(SupplierRow::into_domain).transpose()
    }

    pub fn list(&self, order: ListOrder) -> RepositoryResult<Vec<Supplier>> {
        let conn = self.get_conn()?;
        Self::query_list(&conn, order)
    }

    /// 删除供应商（仍被原料记录引用时由外键拒绝）
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let affected = {
            let conn = self.get_conn()?;
            conn.execute("DELETE FROM suppliers WHERE id = ?1", params![id])?
        };
        if affected == 0 {
            return Err(RepositoryError::not_found("Supplier", id));
        }
        self.hub.publish(Collection::Suppliers);
        Ok(())
    }

    /// 实时订阅供应商列表（最新在前）
    pub fn subscribe(&self) -> RepositoryResult<Subscription<Supplier>> {
        let conn = self.conn.clone();
        self.hub.register(Collection::Suppliers, move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            Self::query_list(&guard, ListOrder::NewestFirst)
        })
    }
}
