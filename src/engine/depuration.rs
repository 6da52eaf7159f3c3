// ==========================================
// 贝类加工追溯系统 - 净化状态机
// ==========================================
// 状态: (无记录|pending) --start--> in-progress --complete--> completed（终态）
// 红线: 只有 completed 解锁加工
// 说明: 已用时长是展示值，不落库，每次观察时重算
// ==========================================

use crate::domain::lot::{DepurationData, Lot, WaterReadings};
use crate::domain::types::DepurationStatus;
use crate::engine::error::{require_finite, require_text, RuleResult, RuleViolation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 无净化记录时的状态名（用于错误信息）
const ABSENT: &str = "absent";

/// 净化已用时长（整小时 + 余分钟）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTime {
    pub hours: i64,
    pub minutes: i64, // 0..=59
}

/// 计算 start 到 now 的已用时长；时钟倒挂时记为 0
pub fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> ElapsedTime {
    let total_minutes = (now - start).num_minutes().max(0);
    ElapsedTime {
        hours: total_minutes / 60,
        minutes: total_minutes % 60,
    }
}

/// 校验并组装水质读数
pub fn readings_from(temperature: Option<f64>, salinity: Option<f64>) -> RuleResult<WaterReadings> {
    Ok(WaterReadings {
        temperature_c: require_finite("temperature", temperature)?,
        salinity_ppt: require_finite("salinity", salinity)?,
    })
}

// ==========================================
// DepurationEngine - 净化状态机
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct DepurationEngine;

impl DepurationEngine {
    pub fn new() -> Self {
        Self
    }

    fn status_name(current: Option<&DepurationData>) -> String {
        current
            .map(|d| d.status.to_string())
            .unwrap_or_else(|| ABSENT.to_string())
    }

    /// 开始净化
    ///
    /// # 参数
    /// - current: 批次现有净化记录
    /// - tank_number: 净化池编号（必填）
    /// - readings: 初始水质读数
    /// - now: 开始时间
    ///
    /// # 返回
    /// - Ok(DepurationData): status=in-progress 的新记录
    /// - Err: 池号为空，或已开始/已完成
    pub fn start(
        &self,
        current: Option<&DepurationData>,
        tank_number: &str,
        readings: WaterReadings,
        now: DateTime<Utc>,
    ) -> RuleResult<DepurationData> {
        match current.map(|d| d.status) {
            None | Some(DepurationStatus::Pending) => {}
            Some(_) => {
                return Err(RuleViolation::transition(
                    Self::status_name(current),
                    DepurationStatus::InProgress,
                ))
            }
        }

        let tank_number = require_text("tankNumber", tank_number)?;

        Ok(DepurationData {
            status: DepurationStatus::InProgress,
            tank_number,
            start_time: now,
            start_readings: readings,
            completed_at: None,
            end_readings: None,
        })
    }

    /// 完成净化（仅允许 in-progress -> completed）
    pub fn complete(
        &self,
        current: Option<&DepurationData>,
        readings: WaterReadings,
        now: DateTime<Utc>,
    ) -> RuleResult<DepurationData> {
        match current {
            Some(data) if data.status == DepurationStatus::InProgress => Ok(DepurationData {
                status: DepurationStatus::Completed,
                completed_at: Some(now),
                end_readings: Some(readings),
                ..data.clone()
            }),
            _ => Err(RuleViolation::transition(
                Self::status_name(current),
                DepurationStatus::Completed,
            )),
        }
    }

    /// 净化中的已用时长；其他状态返回 None
    pub fn elapsed(&self, data: &DepurationData, now: DateTime<Utc>) -> Option<ElapsedTime> {
        (data.status == DepurationStatus::InProgress)
            .then(|| elapsed_between(data.start_time, now))
    }

    /// 加工闸门: 净化完成才放行
    pub fn is_processing_unlocked(lot: &Lot) -> bool {
        lot.depuration_status() == Some(DepurationStatus::Completed)
    }

    /// 加工闸门（返回规则违反原因）
    pub fn ensure_processing_unlocked(lot: &Lot) -> RuleResult<()> {
        if Self::is_processing_unlocked(lot) {
            Ok(())
        } else {
            Err(RuleViolation::DepurationIncomplete {
                lot_number: lot.lot_number.clone(),
                status: Self::status_name(lot.depuration_data.as_ref()),
            })
        }
    }
}
