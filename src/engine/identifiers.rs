// ==========================================
// 贝类加工追溯系统 - 标识生成
// ==========================================
// 批次号: "L" + yyMMddHHmm（分钟精度，同分钟冲突由仓储层加后缀消解）
// 箱号:   "SO"/"CM" + 毫秒时间戳末 6 位
// ==========================================

use crate::domain::types::ProductType;
use chrono::{DateTime, NaiveDateTime, Utc};

/// 批次号前缀
pub const LOT_NUMBER_PREFIX: &str = "L";

/// 由创建时间生成批次号，例如 2024-05-17 12:30 -> L2405171230
pub fn generate_lot_number(at: NaiveDateTime) -> String {
    format!("{}{}", LOT_NUMBER_PREFIX, at.format("%y%m%d%H%M"))
}

/// 同一分钟内第 n 个批次的批次号（n=1 时为原值）
pub fn disambiguate_lot_number(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

/// 生成箱号: 前缀 + 毫秒时间戳末 6 位
pub fn generate_box_number(box_type: ProductType, at: DateTime<Utc>) -> String {
    let millis = at.timestamp_millis().rem_euclid(1_000_000);
    format!("{}{:06}", box_type.box_prefix(), millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn test_lot_number_format() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 17)
            .unwrap()
            .and_hms_opt(12, 30, 59)
            .unwrap();
        assert_eq!(generate_lot_number(at), "L2405171230");
    }

    #[test]
    fn test_lot_number_disambiguation() {
        assert_eq!(disambiguate_lot_number("L2405171230", 1), "L2405171230");
        assert_eq!(disambiguate_lot_number("L2405171230", 3), "L2405171230-3");
    }

    #[test]
    fn test_box_number_prefix_by_type() {
        let at = Utc.timestamp_millis_opt(1_715_949_000_123).unwrap();
        assert_eq!(generate_box_number(ProductType::ShellOn, at), "SO000123");
        assert_eq!(generate_box_number(ProductType::Meat, at), "CM000123");

        let at = Utc.timestamp_millis_opt(1_715_949_654_321).unwrap();
        let box_number = generate_box_number(ProductType::Meat, at);
        assert!(box_number.starts_with("CM"));
        assert_eq!(&box_number[2..], "654321");
    }
}
