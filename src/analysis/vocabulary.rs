// ==========================================
// PIM 商品导入系统 - 属性词表
// ==========================================
// 用途: SKU 模式分析（attribute_based）与 ExtractAttributesAction 共用
// 规则: 按分隔符切词后做整词匹配,不区分大小写
// ==========================================

use serde::{Deserialize, Serialize};

/// 尺码词表
pub const SIZE_WORDS: &[&str] = &[
    "s",
    "m",
    "l",
    "xl",
    "xxl",
    "small",
    "medium",
    "large",
    "extra large",
];

/// 颜色词表
pub const COLOR_WORDS: &[&str] = &[
    "red", "blue", "green", "black", "white", "yellow", "purple", "orange", "pink", "brown",
];

/// SKU 切词分隔符
pub const SKU_SEPARATORS: &[char] = &['-', '_', '.', ' ', '/'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Size,
    Color,
}

impl AttributeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeKind::Size => "size",
            AttributeKind::Color => "color",
        }
    }
}

/// SKU 中命中的属性词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMatch {
    pub kind: AttributeKind,
    pub word: String, // 小写词表词,例: "extra large"
    first_token: usize,
    token_count: usize,
}

impl AttributeMatch {
    /// 规范化后的属性值（颜色首字母大写,短尺码全大写）
    pub fn normalized(&self) -> String {
        match self.kind {
            AttributeKind::Size if self.word.len() <= 3 => self.word.to_uppercase(),
            _ => title_case(&self.word),
        }
    }
}

pub fn split_tokens(sku: &str) -> Vec<&str> {
    sku.split(|c: char| SKU_SEPARATORS.contains(&c))
        .filter(|t| !t.is_empty())
        .collect()
}

fn lookup(word: &str) -> Option<AttributeKind> {
    if SIZE_WORDS.contains(&word) {
        Some(AttributeKind::Size)
    } else if COLOR_WORDS.contains(&word) {
        Some(AttributeKind::Color)
    } else {
        None
    }
}

/// 找出 SKU 中所有整词命中的属性（两词短语优先）
pub fn find_attributes(sku: &str) -> Vec<AttributeMatch> {
    let tokens: Vec<String> = split_tokens(sku).iter().map(|t| t.to_lowercase()).collect();
    let mut matches = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        if i + 1 < tokens.len() {
            let phrase = format!("{} {}", tokens[i], tokens[i + 1]);
            if let Some(kind) = lookup(&phrase) {
                matches.push(AttributeMatch {
                    kind,
                    word: phrase,
                    first_token: i,
                    token_count: 2,
                });
                i += 2;
                continue;
            }
        }
        if let Some(kind) = lookup(&tokens[i]) {
            matches.push(AttributeMatch {
                kind,
                word: tokens[i].clone(),
                first_token: i,
                token_count: 1,
            });
        }
        i += 1;
    }

    matches
}

/// 首个命中的指定类别属性
pub fn first_attribute(sku: &str, kind: AttributeKind) -> Option<AttributeMatch> {
    find_attributes(sku).into_iter().find(|m| m.kind == kind)
}

/// 去掉所有属性词及其分隔符,剩余词以 SKU 中首个分隔符拼接
///
/// # 示例
/// - `ABC-RED-S` → `ABC`
/// - `TEE_EXTRA_LARGE_01` → `TEE_01`
pub fn strip_attributes(sku: &str) -> String {
    let tokens = split_tokens(sku);
    let matches = find_attributes(sku);
    let covered = |idx: usize| {
        matches
            .iter()
            .any(|m| idx >= m.first_token && idx < m.first_token + m.token_count)
    };

    let separator = sku
        .chars()
        .find(|c| SKU_SEPARATORS.contains(c))
        .unwrap_or('-')
        .to_string();

    tokens
        .iter()
        .enumerate()
        .filter(|(idx, _)| !covered(*idx))
        .map(|(_, t)| *t)
        .collect::<Vec<_>>()
        .join(&separator)
}

/// 首字母大写,其余小写（按空格分词）
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_word_matching() {
        let found = find_attributes("ABC-RED-S");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind, AttributeKind::Color);
        assert_eq!(found[1].kind, AttributeKind::Size);

        // 非整词不命中
        assert!(find_attributes("REDWOOD-SMALLS").is_empty());
        assert!(find_attributes("PROD-001").is_empty());
    }

    #[test]
    fn test_two_word_phrase() {
        let found = find_attributes("tee-extra-large");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].word, "extra large");
        assert_eq!(found[0].normalized(), "Extra Large");
    }

    #[test]
    fn test_strip_attributes() {
        assert_eq!(strip_attributes("ABC-RED-S"), "ABC");
        assert_eq!(strip_attributes("TEE_EXTRA_LARGE_01"), "TEE_01");
        assert_eq!(strip_attributes("RED-S"), "");
    }

    #[test]
    fn test_normalized_values() {
        assert_eq!(first_attribute("X-blue-xl", AttributeKind::Color).unwrap().normalized(), "Blue");
        assert_eq!(first_attribute("X-blue-xl", AttributeKind::Size).unwrap().normalized(), "XL");
        assert_eq!(title_case("hello WORLD"), "Hello World");
    }
}
