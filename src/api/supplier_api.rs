// ==========================================
// 贝类加工追溯系统 - 供应商 API
// ==========================================

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::notice::Notice;
use crate::domain::supplier::{NewSupplier, Supplier};
use crate::engine::error::require_text;
use crate::i18n::t_with_args;
use crate::repository::query::ListOrder;
use crate::repository::subscription::Subscription;
use crate::repository::supplier_repo::SupplierRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierOutcome {
    pub supplier: Supplier,
    pub notices: Vec<Notice>,
}

pub struct SupplierApi {
    supplier_repo: Arc<SupplierRepository>,
}

impl SupplierApi {
    pub fn new(supplier_repo: Arc<SupplierRepository>) -> Self {
        Self { supplier_repo }
    }

    /// 登记供应商（三个字段均必填）
    pub fn create_supplier(
        &self,
        name: &str,
        contact: &str,
        license_number: &str,
    ) -> ApiResult<SupplierOutcome> {
        let new_supplier = NewSupplier {
            name: require_text("name", name)?,
            contact: require_text("contact", contact)?,
            license_number: require_text("licenseNumber", license_number)?,
        };
        let supplier = self.supplier_repo.insert(&new_supplier)?;
        info!(supplier_id = %supplier.id, name = %supplier.name, "供应商已登记");

        let message = t_with_args("supplier.created", &[("name", &supplier.name)]);
        Ok(SupplierOutcome {
            supplier,
            notices: vec![Notice::success(message)],
        })
    }

    pub fn list_suppliers(&self) -> ApiResult<Vec<Supplier>> {
        Ok(self.supplier_repo.list(ListOrder::NewestFirst)?)
    }

    pub fn subscribe_suppliers(&self) -> ApiResult<Subscription<Supplier>> {
        Ok(self.supplier_repo.subscribe()?)
    }
}
