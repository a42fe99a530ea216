// ==========================================
// PIM 商品导入系统 - 冲突处理结果与统计
// ==========================================
// 职责: ConflictResolution（单次处理结果）+ ResolutionStats（批次级计数）
// 红线: 统计对象由调用方持有并按批次重置,不做全局单例
// ==========================================

use crate::conflict::violation::ConflictType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ==========================================
// ResolutionAction - 调用方下一步动作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    Retry,      // 用修正数据重跑整条管道
    Skip,       // 放弃本行
    Unresolved, // 无法处理
}

// ==========================================
// ConflictResolution - 单次冲突处理结果
// ==========================================
// resolved = true 时: Retry 的 corrected_data 至少在冲突字段上与原数据不同;
//                    Skip 的 corrected_data 与原数据相同
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictResolution {
    pub resolved: bool,
    pub conflict_type: ConflictType,
    pub strategy: String,
    pub action: ResolutionAction,
    pub corrected_data: Map<String, Value>,
    pub attempts: u32,
    pub message: Option<String>,
}

impl ConflictResolution {
    pub fn retry(
        conflict_type: ConflictType,
        strategy: &str,
        corrected_data: Map<String, Value>,
    ) -> Self {
        Self {
            resolved: true,
            conflict_type,
            strategy: strategy.to_string(),
            action: ResolutionAction::Retry,
            corrected_data,
            attempts: 1,
            message: None,
        }
    }

    pub fn skip(conflict_type: ConflictType, strategy: &str, data: &Map<String, Value>) -> Self {
        Self {
            resolved: true,
            conflict_type,
            strategy: strategy.to_string(),
            action: ResolutionAction::Skip,
            corrected_data: data.clone(),
            attempts: 1,
            message: Some(format!("按策略 {} 跳过本行", strategy)),
        }
    }

    pub fn unresolved(
        conflict_type: ConflictType,
        strategy: &str,
        data: &Map<String, Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            resolved: false,
            conflict_type,
            strategy: strategy.to_string(),
            action: ResolutionAction::Unresolved,
            corrected_data: data.clone(),
            attempts: 1,
            message: Some(message.into()),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn should_retry(&self) -> bool {
        self.resolved && self.action == ResolutionAction::Retry
    }

    pub fn should_skip(&self) -> bool {
        self.resolved && self.action == ResolutionAction::Skip
    }
}

// ==========================================
// ResolutionStats - 冲突处理统计
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub total_conflicts: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub skipped: u64,
    pub by_type: BTreeMap<String, u64>,     // 冲突类型 → 次数
    pub by_strategy: BTreeMap<String, u64>, // 策略 → 次数
}

impl ResolutionStats {
    pub fn record(&mut self, resolution: &ConflictResolution) {
        self.total_conflicts += 1;
        match resolution.action {
            ResolutionAction::Retry => self.resolved += 1,
            ResolutionAction::Skip => {
                self.resolved += 1;
                self.skipped += 1;
            }
            ResolutionAction::Unresolved => self.unresolved += 1,
        }

        *self
            .by_type
            .entry(resolution.conflict_type.as_str().to_string())
            .or_insert(0) += 1;
        *self
            .by_strategy
            .entry(resolution.strategy.clone())
            .or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &ResolutionStats) {
        self.total_conflicts += other.total_conflicts;
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
        self.skipped += other.skipped;
        for (k, v) in &other.by_type {
            *self.by_type.entry(k.clone()).or_insert(0) += v;
        }
        for (k, v) in &other.by_strategy {
            *self.by_strategy.entry(k.clone()).or_insert(0) += v;
        }
    }

    pub fn reset(&mut self) {
        *self = ResolutionStats::default();
    }

    pub fn is_empty(&self) -> bool {
        self.total_conflicts == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_and_merge() {
        let data = Map::new();
        let mut stats = ResolutionStats::default();
        stats.record(&ConflictResolution::retry(
            ConflictType::DuplicateSku,
            "generate_unique",
            data.clone(),
        ));
        stats.record(&ConflictResolution::skip(ConflictType::DuplicateBarcode, "skip", &data));
        stats.record(&ConflictResolution::unresolved(
            ConflictType::VariantConstraint,
            "merge_data",
            &data,
            "existing variant vanished",
        ));

        assert_eq!(stats.total_conflicts, 3);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.by_type.get("duplicate_sku"), Some(&1));
        assert_eq!(stats.by_strategy.get("skip"), Some(&1));

        let mut total = ResolutionStats::default();
        total.merge(&stats);
        total.merge(&stats);
        assert_eq!(total.total_conflicts, 6);
        assert_eq!(total.by_type.get("variant_constraint"), Some(&2));

        total.reset();
        assert!(total.is_empty());
    }

    #[test]
    fn test_skip_keeps_data() {
        let mut data = Map::new();
        data.insert("sku".to_string(), Value::from("A-1"));
        let r = ConflictResolution::skip(ConflictType::DuplicateSku, "skip", &data);
        assert!(r.resolved);
        assert!(r.should_skip());
        assert_eq!(r.corrected_data, data);
    }
}
