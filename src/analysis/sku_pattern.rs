// ==========================================
// PIM 商品导入系统 - SKU 模式分析
// ==========================================
// 职责: 从一批 SKU 推断父商品分组
// 输入: SKU 列表
// 输出: SkuPatternResult（模式类型 / 置信度 / 建议分组 / 建议父商品名）
// 红线: 纯函数,无 I/O,无内部状态;相同输入输出完全一致
// ==========================================
// 四种分析相互独立:
// - hierarchical:         按分隔符切出首段分组
// - sequential:           公共前缀 + 数字序号
// - attribute_based:      尺码/颜色词表命中
// - numeric_hierarchical: ###-### 形式,按前三位分组
// 平局规则: 按上述顺序,后者只有置信度严格更高才胜出
// ==========================================

use crate::analysis::vocabulary::{
    find_attributes, split_tokens, strip_attributes, title_case, AttributeKind, SKU_SEPARATORS,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::OnceLock;


/// 分层分析尝试的分隔符（按顺序）
const HIERARCHY_SEPARATORS: [char; 3] = ['-', '_', '.'];

/// 序号分析的最短公共前缀
const MIN_SEQUENTIAL_PREFIX: usize = 2;

const SEQUENTIAL_CONSECUTIVE_CONFIDENCE: f64 = 0.8;
const SEQUENTIAL_GAPPED_CONFIDENCE: f64 = 0.4;
const ATTRIBUTE_HIT_CONFIDENCE: f64 = 0.3;

/// 属性词需在至少这么多 SKU 中出现
const MIN_ATTRIBUTE_SKUS: usize = 2;

/// 父商品名回退时取的最短字母词长度
const MIN_NAME_WORD_LEN: usize = 3;

// ==========================================
// PatternType - 模式类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Hierarchical,
    Sequential,
    AttributeBased,
    NumericHierarchical,
}

impl PatternType {
    /// 评估顺序,同时也是平局时的优先级
    pub const ORDER: [PatternType; 4] = [
        PatternType::Hierarchical,
        PatternType::Sequential,
        PatternType::AttributeBased,
        PatternType::NumericHierarchical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternType::Hierarchical => "hierarchical",
            PatternType::Sequential => "sequential",
            PatternType::AttributeBased => "attribute_based",
            PatternType::NumericHierarchical => "numeric_hierarchical",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// PatternAnalysis - 单项分析结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub pattern_type: PatternType,
    pub has_pattern: bool,
    pub confidence: f64,                         // [0, 1]
    pub groups: BTreeMap<String, Vec<String>>,   // 父级键 → 成员 SKU
    pub attributes_detected: Vec<String>,        // 仅 attribute_based 使用
    pub prefix: Option<String>,                  // sequential 的分组前缀
}

impl PatternAnalysis {
    fn none(pattern_type: PatternType) -> Self {
        Self {
            pattern_type,
            has_pattern: false,
            confidence: 0.0,
            groups: BTreeMap::new(),
            attributes_detected: Vec::new(),
            prefix: None,
        }
    }

    fn found(pattern_type: PatternType, confidence: f64, groups: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            pattern_type,
            has_pattern: true,
            confidence: confidence.clamp(0.0, 1.0),
            groups,
            attributes_detected: Vec::new(),
            prefix: None,
        }
    }

    /// 命名用的父级键: 有前缀取前缀,否则取成员最多的分组（同数取字典序最小）
    fn parent_key(&self) -> Option<&str> {
        if let Some(prefix) = self.prefix.as_deref() {
            return Some(prefix);
        }
        let mut best: Option<(&String, usize)> = None;
        for (key, members) in &self.groups {
            if best.map_or(true, |(_, n)| members.len() > n) {
                best = Some((key, members.len()));
            }
        }
        best.map(|(key, _)| key.as_str())
    }
}

// ==========================================
// SkuPatternResult - 汇总结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuPatternResult {
    pub has_pattern: bool,
    pub pattern_type: Option<PatternType>,
    pub confidence: f64,
    pub suggested_groups: BTreeMap<String, Vec<String>>,
    pub suggested_parent_key: Option<String>, // 命名所依据的父级键
    pub suggested_parent_name: Option<String>,
    pub attributes_detected: Vec<String>,
    pub analyses: Vec<PatternAnalysis>, // 四项分析明细,按评估顺序
}

impl SkuPatternResult {
    /// SKU 所属的建议父级键
    pub fn group_of(&self, sku: &str) -> Option<&str> {
        self.suggested_groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == sku))
            .map(|(key, _)| key.as_str())
    }

    /// 分组的建议父商品名: 命名键取 suggested_parent_name,其余分组取键的标题化形式
    pub fn parent_name_for(&self, group_key: &str) -> String {
        match (&self.suggested_parent_key, &self.suggested_parent_name) {
            (Some(key), Some(name)) if key == group_key => name.clone(),
            _ => title_case(&split_tokens(group_key).join(" ")),
        }
    }
}

// ==========================================
// SkuPatternAnalyzer
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SkuPatternAnalyzer;

impl SkuPatternAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// 分析一批 SKU（空白 SKU 忽略）
    pub fn analyze<S: AsRef<str>>(&self, skus: &[S]) -> SkuPatternResult {
        let skus: Vec<&str> = skus
            .iter()
            .map(|s| s.as_ref().trim())
            .filter(|s| !s.is_empty())
            .collect();

        let analyses: Vec<PatternAnalysis> = PatternType::ORDER
            .iter()
            .map(|pattern_type| match pattern_type {
                PatternType::Hierarchical => analyze_hierarchical(&skus),
                PatternType::Sequential => analyze_sequential(&skus),
                PatternType::AttributeBased => analyze_attribute_based(&skus),
                PatternType::NumericHierarchical => analyze_numeric_hierarchical(&skus),
            })
            .collect();

        let mut winner: Option<&PatternAnalysis> = None;
        for analysis in analyses.iter().filter(|a| a.has_pattern) {
            if winner.map_or(true, |w| analysis.confidence > w.confidence) {
                winner = Some(analysis);
            }
        }

        match winner {
            Some(w) => SkuPatternResult {
                has_pattern: true,
                pattern_type: Some(w.pattern_type),
                confidence: w.confidence,
                suggested_groups: w.groups.clone(),
                suggested_parent_key: w.parent_key().map(str::to_string),
                suggested_parent_name: suggest_parent_name(w, skus.first().copied()),
                attributes_detected: w.attributes_detected.clone(),
                analyses: analyses.clone(),
            },
            None => SkuPatternResult {
                has_pattern: false,
                pattern_type: None,
                confidence: 0.0,
                suggested_groups: BTreeMap::new(),
                suggested_parent_key: None,
                suggested_parent_name: None,
                attributes_detected: Vec::new(),
                analyses: analyses.clone(),
            },
        }
    }
}

// ==========================================
// 各项分析
// ==========================================

/// 覆盖率 + 分组多样性
fn grouping_confidence(grouped: usize, groups: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let coverage = grouped as f64 / total as f64;
    let variety = groups as f64 / total as f64;
    (0.7 * coverage + 0.3 * variety).min(1.0)
}

fn push_member(groups: &mut BTreeMap<String, Vec<String>>, key: &str, sku: &str) {
    groups.entry(key.to_string()).or_default().push(sku.to_string());
}

pub(crate) fn analyze_hierarchical(skus: &[&str]) -> PatternAnalysis {
    for separator in HIERARCHY_SEPARATORS {
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut all_split = !skus.is_empty();

        for sku in skus {
            match sku.split_once(separator) {
                Some((head, tail)) if !head.is_empty() && !tail.is_empty() => {
                    push_member(&mut groups, head, sku);
                }
                _ => {
                    all_split = false;
                    break;
                }
            }
        }

        if all_split && groups.len() >= 2 {
            let confidence = grouping_confidence(skus.len(), groups.len(), skus.len());
            return PatternAnalysis::found(PatternType::Hierarchical, confidence, groups);
        }
    }

    PatternAnalysis::none(PatternType::Hierarchical)
}

fn common_prefix<'a>(skus: &[&'a str]) -> &'a str {
    let Some(first) = skus.first() else {
        return "";
    };
    let mut len = first.len();
    for sku in &skus[1..] {
        len = first
            .char_indices()
            .zip(sku.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((idx, a), _)| idx + a.len_utf8())
            .min(len);
    }
    &first[..len]
}

pub(crate) fn analyze_sequential(skus: &[&str]) -> PatternAnalysis {
    if skus.len() < 2 {
        return PatternAnalysis::none(PatternType::Sequential);
    }

    let prefix = common_prefix(skus);
    if prefix.chars().count() < MIN_SEQUENTIAL_PREFIX {
        return PatternAnalysis::none(PatternType::Sequential);
    }

    let mut numbers = Vec::with_capacity(skus.len());
    for sku in skus {
        let remainder = &sku[prefix.len()..];
        if remainder.is_empty() || !remainder.chars().all(|c| c.is_ascii_digit()) {
            return PatternAnalysis::none(PatternType::Sequential);
        }
        match remainder.parse::<u64>() {
            Ok(n) => numbers.push(n),
            Err(_) => return PatternAnalysis::none(PatternType::Sequential),
        }
    }

    numbers.sort_unstable();
    let consecutive = numbers.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]));
    let confidence = if consecutive {
        SEQUENTIAL_CONSECUTIVE_CONFIDENCE
    } else {
        SEQUENTIAL_GAPPED_CONFIDENCE
    };

    // 分组键: 去掉前缀尾部的数字与分隔符（PROD-00 → PROD）
    let trimmed = prefix.trim_end_matches(|c: char| c.is_ascii_digit() || SKU_SEPARATORS.contains(&c));
    let key = if trimmed.is_empty() { prefix } else { trimmed };

    let mut groups = BTreeMap::new();
    for sku in skus {
        push_member(&mut groups, key, sku);
    }

    let mut analysis = PatternAnalysis::found(PatternType::Sequential, confidence, groups);
    analysis.prefix = Some(key.to_string());
    analysis
}

pub(crate) fn analyze_attribute_based(skus: &[&str]) -> PatternAnalysis {
    let mut hits: BTreeMap<AttributeKind, usize> = BTreeMap::new();
    for sku in skus {
        let kinds: BTreeSet<AttributeKind> = find_attributes(sku).iter().map(|m| m.kind).collect();
        for kind in kinds {
            *hits.entry(kind).or_insert(0) += 1;
        }
    }

    let detected: Vec<AttributeKind> = hits
        .iter()
        .filter(|(_, count)| **count >= MIN_ATTRIBUTE_SKUS)
        .map(|(kind, _)| *kind)
        .collect();
    if detected.is_empty() {
        return PatternAnalysis::none(PatternType::AttributeBased);
    }

    let mut groups = BTreeMap::new();
    for sku in skus {
        let base = strip_attributes(sku);
        let key = if base.is_empty() { sku.to_string() } else { base };
        push_member(&mut groups, &key, sku);
    }

    let confidence = ATTRIBUTE_HIT_CONFIDENCE * detected.len() as f64;
    let mut analysis = PatternAnalysis::found(PatternType::AttributeBased, confidence, groups);
    analysis.attributes_detected = detected.iter().map(|k| k.as_str().to_string()).collect();
    analysis
}

fn numeric_sku_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{3})-\d{3}$").ok()).as_ref()
}

pub(crate) fn analyze_numeric_hierarchical(skus: &[&str]) -> PatternAnalysis {
    let Some(re) = numeric_sku_regex() else {
        return PatternAnalysis::none(PatternType::NumericHierarchical);
    };

    let mut groups = BTreeMap::new();
    let mut matched = 0;
    for sku in skus {
        if let Some(parent) = re.captures(sku).and_then(|c| c.get(1)) {
            push_member(&mut groups, parent.as_str(), sku);
            matched += 1;
        }
    }

    if matched < 2 {
        return PatternAnalysis::none(PatternType::NumericHierarchical);
    }

    let confidence = grouping_confidence(matched, groups.len(), skus.len());
    PatternAnalysis::found(PatternType::NumericHierarchical, confidence, groups)
}

// ==========================================
// 父商品命名
// ==========================================

fn suggest_parent_name(winner: &PatternAnalysis, first_sku: Option<&str>) -> Option<String> {
    let key = winner.parent_key()?;

    if key.chars().any(|c| c.is_alphabetic()) {
        return Some(title_case(&split_tokens(key).join(" ")));
    }

    // 键里没有字母（如 100）: 取首个 SKU 中的长字母词
    let fallback: Vec<String> = first_sku
        .map(|sku| {
            sku.split(|c: char| !c.is_alphabetic())
                .filter(|w| w.chars().count() >= MIN_NAME_WORD_LEN)
                .map(title_case)
                .collect()
        })
        .unwrap_or_default();

    if fallback.is_empty() {
        Some(split_tokens(key).join(" "))
    } else {
        Some(fallback.join(" "))
    }
}
