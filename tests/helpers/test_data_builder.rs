// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::NaiveDate;
use seafood_trace::api::RecordIntakeRequest;
use seafood_trace::domain::processing::QcCriterion;
use seafood_trace::domain::types::ProductType;
use seafood_trace::engine::packaging_qc::QcChecklistEntry;
use seafood_trace::engine::processing::BoxDraft;

// ==========================================
// 收货请求构建器
// ==========================================

pub struct IntakeBuilder {
    supplier_id: String,
    weight: Option<f64>,
    date: NaiveDate,
}

impl IntakeBuilder {
    pub fn new(supplier_id: &str) -> Self {
        Self {
            supplier_id: supplier_id.to_string(),
            weight: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn build(self) -> RecordIntakeRequest {
        RecordIntakeRequest {
            supplier_id: self.supplier_id,
            weight: self.weight,
            date: self.date,
        }
    }
}

// ==========================================
// 装箱草稿构建器
// ==========================================

pub struct BoxDraftBuilder {
    box_type: ProductType,
    box_number: String,
    weight: Option<f64>,
    grade: String,
}

impl BoxDraftBuilder {
    pub fn shell_on(box_number: &str) -> Self {
        Self::new(ProductType::ShellOn, box_number)
    }

    pub fn meat(box_number: &str) -> Self {
        Self::new(ProductType::Meat, box_number)
    }

    fn new(box_type: ProductType, box_number: &str) -> Self {
        Self {
            box_type,
            box_number: box_number.to_string(),
            weight: None,
            grade: "A".to_string(),
        }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn grade(mut self, grade: &str) -> Self {
        self.grade = grade.to_string();
        self
    }

    pub fn no_weight(mut self) -> Self {
        self.weight = None;
        self
    }

    pub fn build(self) -> BoxDraft {
        BoxDraft {
            box_type: self.box_type,
            box_number: self.box_number,
            weight: self.weight,
            grade: self.grade,
        }
    }
}

// ==========================================
// 包装质检检查表构建器
// ==========================================

pub struct ChecklistBuilder {
    entries: Vec<QcChecklistEntry>,
}

impl ChecklistBuilder {
    /// 六项全部合格
    pub fn all_passed() -> Self {
        Self {
            entries: QcCriterion::ALL
                .iter()
                .map(|c| QcChecklistEntry::new(*c, Some(true), ""))
                .collect(),
        }
    }

    pub fn fail(mut self, criterion: QcCriterion, notes: &str) -> Self {
        self.set(criterion, Some(false), notes);
        self
    }

    pub fn undecided(mut self, criterion: QcCriterion) -> Self {
        self.set(criterion, None, "");
        self
    }

    pub fn without(mut self, criterion: QcCriterion) -> Self {
        self.entries.retain(|e| e.criterion != criterion);
        self
    }

    fn set(&mut self, criterion: QcCriterion, passed: Option<bool>, notes: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.criterion == criterion) {
            entry.passed = passed;
            entry.notes = notes.to_string();
        }
    }

    pub fn build(self) -> Vec<QcChecklistEntry> {
        self.entries
    }
}
