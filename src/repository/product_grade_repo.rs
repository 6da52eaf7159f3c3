// ==========================================
// 贝类加工追溯系统 - 产品等级仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 参考数据，(product_type, code) 唯一
// ==========================================

use crate::db::{format_timestamp, storage_now};
use crate::domain::grade::{NewProductGrade, ProductGrade};
use crate::domain::types::ProductType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::query::{enum_field, timestamp_field, ListOrder, ProductGradeFilter};
use crate::repository::subscription::{ChangeHub, Collection, Subscription};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const COLUMNS: &str = "id, code, name, description, product_type, created_at, updated_at";

struct GradeRow {
    id: String,
    code: String,
    name: String,
    description: Option<String>,
    product_type: String,
    created_at: String,
    updated_at: String,
}

impl GradeRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            product_type: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<ProductGrade> {
        Ok(ProductGrade {
            product_type: enum_field("product_type", &self.product_type, ProductType::from_db_str)?,
            created_at: timestamp_field("created_at", &self.created_at)?,
            updated_at: timestamp_field("updated_at", &self.updated_at)?,
            id: self.id,
            code: self.code,
            name: self.name,
            description: self.description,
        })
    }
}

pub struct ProductGradeRepository {
    conn: Arc<Mutex<Connection>>,
    hub: Arc<ChangeHub>,
}

impl ProductGradeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>, hub: Arc<ChangeHub>) -> Self {
        Self { conn, hub }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_list(
        conn: &Connection,
        filter: &ProductGradeFilter,
        order: ListOrder,
    ) -> RepositoryResult<Vec<ProductGrade>> {
        let clause = filter.where_clause();
        let sql = format!(
            "SELECT {} FROM product_grades {} {}",
            COLUMNS,
            clause.sql(),
            order.sql()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(clause.params.iter()), GradeRow::read)?;
        rows.map(|r| r.map_err(RepositoryError::from).and_then(GradeRow::into_domain))
            .collect()
    }

    fn query_by_code(
        conn: &Connection,
        product_type: ProductType,
        code: &str,
    ) -> RepositoryResult<Option<ProductGrade>> {
        let sql = format!(
            "SELECT {} FROM product_grades WHERE product_type = ?1 AND code = ?2",
            COLUMNS
        );
        let row = conn
            .query_row(&sql, params![product_type.to_db_str(), code], GradeRow::read)
            .optional()?;
        row.map(GradeRow::into_domain).transpose()
    }

    pub fn insert(&self, new_grade: &NewProductGrade) -> RepositoryResult<ProductGrade> {
        let now = storage_now();
        let grade = ProductGrade {
            id: Uuid::new_v4().to_string(),
            code: new_grade.code.clone(),
            name: new_grade.name.clone(),
            description: new_grade.description.clone(),
            product_type: new_grade.product_type,
            created_at: now,
            updated_at: now,
        };
        {
            let conn = self.get_conn()?;
            conn.execute(
                "INSERT INTO product_grades (id, code, name, description, product_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    grade.id,
                    grade.code,
                    grade.name,
                    grade.description,
                    grade.product_type.to_db_str(),
                    format_timestamp(now),
                    format_timestamp(now),
                ],
            )?;
        }
        self.hub.publish(Collection::ProductGrades);
        Ok(grade)
    }

    /// 按 (product_type, code) 写入或刷新名称/描述
    ///
    /// # 返回
    /// - Ok(true): 新增
    /// - Ok(false): 已存在，仅刷新
    pub fn upsert(&self, new_grade: &NewProductGrade) -> RepositoryResult<bool> {
        let inserted = {
            let conn = self.get_conn()?;
            let existed = Self::query_by_code(&conn, new_grade.product_type, &new_grade.code)?.is_some();
            let now = format_timestamp(storage_now());
            conn.execute(
                "INSERT INTO product_grades (id, code, name, description, product_type, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT(product_type, code) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    new_grade.code,
                    new_grade.name,
                    new_grade.description,
                    new_grade.product_type.to_db_str(),
                    now,
                ],
            )?;
            !existed
        };
        self.hub.publish(Collection::ProductGrades);
        Ok(inserted)
    }

    pub fn find_by_code(&self, product_type: ProductType, code: &str) -> RepositoryResult<Option<ProductGrade>> {
        let conn = self.get_conn()?;
        Self::query_by_code(&conn, product_type, code)
    }

    pub fn list(&self, filter: &ProductGradeFilter, order: ListOrder) -> RepositoryResult<Vec<ProductGrade>> {
        let conn = self.get_conn()?;
        Self::query_list(&conn, filter, order)
    }

    /// 某产品类型的等级（按创建顺序）
    pub fn list_by_type(&self, product_type: ProductType) -> RepositoryResult<Vec<ProductGrade>> {
        self.list(
            &ProductGradeFilter {
                product_type: Some(product_type),
            },
            ListOrder::OldestFirst,
        )
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let affected = {
            let conn = self.get_conn()?;
            conn.execute("DELETE FROM product_grades WHERE id = ?1", params![id])?
        };
        if affected == 0 {
            return Err(RepositoryError::not_found("ProductGrade", id));
        }
        self.hub.publish(Collection::ProductGrades);
        Ok(())
    }

    pub fn subscribe(&self, filter: ProductGradeFilter) -> RepositoryResult<Subscription<ProductGrade>> {
        let conn = self.conn.clone();
        self.hub.register(Collection::ProductGrades, move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            Self::query_list(&guard, &filter, ListOrder::OldestFirst)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, ensure_schema};

    fn setup() -> ProductGradeRepository {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ProductGradeRepository::new(Arc::new(Mutex::new(conn)), ChangeHub::shared())
    }

    fn grade(code: &str, name: &str, product_type: ProductType) -> NewProductGrade {
        NewProductGrade {
            code: code.to_string(),
            name: name.to_string(),
            description: None,
            product_type,
        }
    }

    #[test]
    fn test_upsert_is_idempotent_on_code() {
        let repo = setup();
        assert!(repo.upsert(&grade("A", "Premium", ProductType::ShellOn)).unwrap());
        assert!(!repo.upsert(&grade("A", "Premium+", ProductType::ShellOn)).unwrap());
        // 同一代码在不同产品类型下互不冲突
        assert!(repo.upsert(&grade("A", "Premium meat", ProductType::Meat)).unwrap());

        let shell_on = repo.list_by_type(ProductType::ShellOn).unwrap();
        assert_eq!(shell_on.len(), 1);
        assert_eq!(shell_on[0].name, "Premium+");
    }

    #[test]
    fn test_duplicate_insert_is_unique_violation() {
        let repo = setup();
        repo.insert(&grade("B", "Standard", ProductType::Meat)).unwrap();
        let err = repo.insert(&grade("B", "Again", ProductType::Meat)).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_find_by_code() {
        let repo = setup();
        repo.insert(&grade("C", "Commercial", ProductType::ShellOn)).unwrap();
        assert!(repo.find_by_code(ProductType::ShellOn, "C").unwrap().is_some());
        assert!(repo.find_by_code(ProductType::Meat, "C").unwrap().is_none());
    }
}
