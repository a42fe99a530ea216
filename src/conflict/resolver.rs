// ==========================================
// PIM 商品导入系统 - 冲突处理器
// ==========================================
// 职责: 按 ConflictType 分派到对应的策略处理器,并累计统计
// 输入: 结构化 ConstraintViolation + 行数据快照
// 输出: ConflictResolution（修正数据 / 跳过 / 无法处理）
// 红线: 一次只处理一个约束违反;多个冲突由调用方逐次重跑管道
// ==========================================

use crate::config::ConflictResolutionConfig;
use crate::conflict::barcode_resolver::DuplicateBarcodeResolver;
use crate::conflict::resolution::{ConflictResolution, ResolutionStats};
use crate::conflict::sku_resolver::DuplicateSkuResolver;
use crate::conflict::unique_resolver::UniqueConstraintResolver;
use crate::conflict::variant_resolver::VariantConstraintResolver;
use crate::conflict::violation::{ConflictType, ConstraintViolation};
use crate::repository::{CatalogRepository, RepositoryResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ==========================================
// StrategyResolver Trait
// ==========================================
// 实现者: DuplicateSkuResolver / DuplicateBarcodeResolver /
//         VariantConstraintResolver / UniqueConstraintResolver
pub trait StrategyResolver: Send + Sync {
    fn conflict_type(&self) -> ConflictType;

    /// 当前生效的策略名（统计与日志用）
    fn strategy_name(&self, violation: &ConstraintViolation) -> &'static str;

    fn resolve(
        &self,
        violation: &ConstraintViolation,
        data: &Map<String, Value>,
        repo: &dyn CatalogRepository,
    ) -> RepositoryResult<ConflictResolution>;
}

// ==========================================
// ConflictResolver - 分派器
// ==========================================
pub struct ConflictResolver {
    sku: DuplicateSkuResolver,
    barcode: DuplicateBarcodeResolver,
    variant: VariantConstraintResolver,
    unique: UniqueConstraintResolver,
    repo: Arc<dyn CatalogRepository>,
    stats: ResolutionStats,
}

impl ConflictResolver {
    pub fn new(config: &ConflictResolutionConfig, repo: Arc<dyn CatalogRepository>) -> Self {
        Self {
            sku: DuplicateSkuResolver::new(
                config.sku_resolution.strategy,
                config.max_suffix_attempts,
            ),
            barcode: DuplicateBarcodeResolver::new(config.barcode_resolution.strategy),
            variant: VariantConstraintResolver::new(
                config.variant_resolution.strategy,
                config.max_suffix_attempts,
            ),
            unique: UniqueConstraintResolver::new(
                config.unique_resolution.clone(),
                config.max_suffix_attempts,
            ),
            repo,
            stats: ResolutionStats::default(),
        }
    }

    fn resolver_for(&self, conflict_type: ConflictType) -> &dyn StrategyResolver {
        match conflict_type {
            ConflictType::DuplicateSku => &self.sku,
            ConflictType::DuplicateBarcode => &self.barcode,
            ConflictType::VariantConstraint => &self.variant,
            ConflictType::UniqueConstraint => &self.unique,
        }
    }

    /// 处理一次约束冲突
    ///
    /// # 参数
    /// - violation: 仓储层解析出的约束违反
    /// - data: 发生冲突时的行数据
    /// - attempt: 本行第几次冲突处理（从 1 开始）
    pub fn resolve(
        &mut self,
        violation: &ConstraintViolation,
        data: &Map<String, Value>,
        attempt: u32,
    ) -> RepositoryResult<ConflictResolution> {
        let conflict_type = violation.conflict_type();
        let resolver = self.resolver_for(conflict_type);
        let strategy = resolver.strategy_name(violation);

        debug!(
            conflict_type = %conflict_type,
            strategy = strategy,
            constraint = %violation.constraint_name,
            attempt = attempt,
            "开始处理约束冲突"
        );

        let resolution = resolver
            .resolve(violation, data, self.repo.as_ref())?
            .with_attempts(attempt);

        if resolution.resolved {
            info!(
                conflict_type = %conflict_type,
                strategy = %resolution.strategy,
                action = ?resolution.action,
                attempt = attempt,
                "约束冲突已处理"
            );
        } else {
            warn!(
                conflict_type = %conflict_type,
                strategy = %resolution.strategy,
                attempt = attempt,
                reason = resolution.message.as_deref().unwrap_or(""),
                "约束冲突无法处理"
            );
        }

        self.stats.record(&resolution);
        Ok(resolution)
    }

    /// 不经策略处理器直接登记一次无法处理的冲突（超过重试上限等）
    pub fn record_unresolved(
        &mut self,
        violation: &ConstraintViolation,
        data: &Map<String, Value>,
        message: impl Into<String>,
    ) -> ConflictResolution {
        let conflict_type = violation.conflict_type();
        let strategy = self.resolver_for(conflict_type).strategy_name(violation);
        let resolution = ConflictResolution::unresolved(conflict_type, strategy, data, message);
        self.stats.record(&resolution);
        resolution
    }

    pub fn stats(&self) -> &ResolutionStats {
        &self.stats
    }

    /// 批次开始时调用
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    pub fn take_stats(&mut self) -> ResolutionStats {
        std::mem::take(&mut self.stats)
    }
}

// ==========================================
// 策略处理器共用工具
// ==========================================

/// 读取字符串字段（数字按字面值转换,空串视为缺失）
pub(crate) fn string_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 后缀候选: base-1, base-2, ... base-max（base 为空时为 1, 2, ...）
pub(crate) fn suffix_candidates(base: &str, max_attempts: u32) -> impl Iterator<Item = String> + '_ {
    (1..=max_attempts).map(move |n| {
        if base.is_empty() {
            n.to_string()
        } else {
            format!("{}-{}", base, n)
        }
    })
}

/// 记录首次被修改前的原值（多次修正时保留最初的值）
pub(crate) fn remember_original(data: &mut Map<String, Value>, key: &str, original: Value) {
    let original_key = format!("original_{}", key);
    if !data.contains_key(&original_key) {
        data.insert(original_key, original);
    }
}
