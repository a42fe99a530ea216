// ==========================================
// SKU 模式分析集成测试
// ==========================================
// 测试目标: 公开接口 SkuPatternAnalyzer::analyze 的整批结论
// ==========================================

use pim_import::analysis::{PatternType, SkuPatternAnalyzer};

#[test]
fn test_hierarchical_catalog() {
    let result = SkuPatternAnalyzer::new().analyze(&[
        "TEE-RED-S",
        "TEE-RED-M",
        "CAP-BLUE-M",
        "CAP-BLUE-L",
    ]);

    // 分层 0.85 高于属性分析 0.6
    assert_eq!(result.pattern_type, Some(PatternType::Hierarchical));
    assert!((result.confidence - 0.85).abs() < 1e-9);
    assert_eq!(result.group_of("TEE-RED-M"), Some("TEE"));
    assert_eq!(result.group_of("CAP-BLUE-L"), Some("CAP"));
    assert_eq!(result.group_of("UNKNOWN"), None);

    let attribute = result
        .analyses
        .iter()
        .find(|a| a.pattern_type == PatternType::AttributeBased)
        .unwrap();
    assert!(attribute.has_pattern);
    assert_eq!(attribute.attributes_detected, vec!["size", "color"]);
}

#[test]
fn test_sequential_batch() {
    let result = SkuPatternAnalyzer::new().analyze(&["PROD-001", "PROD-002", "PROD-003"]);

    assert!(result.has_pattern);
    assert_eq!(result.pattern_type, Some(PatternType::Sequential));
    assert_eq!(result.suggested_parent_key.as_deref(), Some("PROD"));
    assert_eq!(result.suggested_parent_name.as_deref(), Some("Prod"));
    assert_eq!(result.parent_name_for("PROD"), "Prod");
}

#[test]
fn test_no_pattern_for_unrelated_skus() {
    let result = SkuPatternAnalyzer::new().analyze(&["X1", "Y2Z", "QQQ"]);

    assert!(!result.has_pattern);
    assert!(result.pattern_type.is_none());
    assert!(result.suggested_groups.is_empty());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_blank_skus_ignored() {
    let analyzer = SkuPatternAnalyzer::new();
    let with_blanks = analyzer.analyze(&["PROD-001", "  ", "", "PROD-002"]);
    let clean = analyzer.analyze(&["PROD-001", "PROD-002"]);

    assert_eq!(with_blanks.has_pattern, clean.has_pattern);
    assert_eq!(with_blanks.pattern_type, clean.pattern_type);
    assert_eq!(with_blanks.suggested_groups, clean.suggested_groups);
}

#[test]
fn test_numeric_groups_keep_numeric_names() {
    let result = SkuPatternAnalyzer::new().analyze(&["100-001", "100-002", "200-001"]);

    assert!(result.has_pattern);
    assert_eq!(result.group_of("100-002"), Some("100"));
    // 键里没有字母,建议名称退回到键本身
    assert_eq!(result.parent_name_for("200"), "200");
}
