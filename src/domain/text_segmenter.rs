//! 文本分割器
//!
//! 把长篇文本切成可朗读的片段（SpeakableUnit），分三层：
//! 1. 段落：按空行分段，短标题 / 目录项整体保留
//! 2. 句子：按句末标点切分，在长度上限内贪心合并
//! 3. 子句 / 长度：超长句按逗号分号再切，仍超长则在软断点处硬切

use serde::{Deserialize, Serialize};

/// 默认片段最大字符数
pub const DEFAULT_MAX_UNIT_CHARS: usize = 150;

/// 默认软断点搜索窗口（上限之前的字符数）
pub const DEFAULT_SOFT_BREAK_WINDOW: usize = 20;

/// 默认软断点字符
pub const DEFAULT_SOFT_BREAKS: &[char] = &['、', ' ', '的', '了', '在', '与', '和', '或'];

/// 短于此长度且无句末标点的段落视为标题
const STRUCTURAL_MAX_CHARS: usize = 50;

/// 文本分割配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// 片段最大字符数（结构性片段不受限）
    pub max_unit_chars: usize,
    /// 软断点搜索窗口
    pub soft_break_window: usize,
    /// 软断点字符
    pub soft_breaks: Vec<char>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            max_unit_chars: DEFAULT_MAX_UNIT_CHARS,
            soft_break_window: DEFAULT_SOFT_BREAK_WINDOW,
            soft_breaks: DEFAULT_SOFT_BREAKS.to_vec(),
        }
    }
}

impl SegmenterConfig {
    pub fn with_max_unit_chars(mut self, max_unit_chars: usize) -> Self {
        self.max_unit_chars = max_unit_chars;
        self
    }
}

/// 可朗读片段
///
/// 不变量:
/// - 文本去除首尾空白后非空
/// - 非结构性片段长度不超过 `max_unit_chars`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakableUnit {
    text: String,
    structural: bool,
    trailing_break: bool,
}

impl SpeakableUnit {
    /// 普通朗读片段
    pub fn speech(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structural: false,
            trailing_break: false,
        }
    }

    /// 标题 / 目录项片段
    pub fn structural(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            structural: true,
            trailing_break: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_structural(&self) -> bool {
        self.structural
    }

    /// 是否为段落的最后一个片段（仅用于展示）
    pub fn has_trailing_break(&self) -> bool {
        self.trailing_break
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    fn mark_trailing_break(&mut self) {
        self.trailing_break = true;
    }
}

/// 句末标点（用于句子切分）
#[inline]
fn is_sentence_terminal(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '；' | '.' | '!' | '?' | ';')
}

/// 完整句子的结尾标点（用于标题判定，不含分号）
#[inline]
fn is_closing_punctuation(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '.' | '!' | '?')
}

/// 子句分隔符
#[inline]
fn is_clause_delimiter(ch: char) -> bool {
    matches!(ch, '，' | ',' | '；' | ';')
}

/// 紧跟在句末标点之后、仍属于本句的闭合符号
#[inline]
fn is_closing_mark(ch: char) -> bool {
    matches!(
        ch,
        '\u{201D}' | '\u{2019}' | '」' | '』' | '）' | ')' | '】' | '》' | '"' | '\''
    )
}

#[inline]
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 按空行分段，段内空白压缩为单个空格
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(collapse_whitespace(&current.join(" ")));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(collapse_whitespace(&current.join(" ")));
    }

    paragraphs
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 标题 / 目录项判定：带【】标记，或短且不以句末标点结尾
fn is_structural(paragraph: &str) -> bool {
    if paragraph.contains('【') && paragraph.contains('】') {
        return true;
    }
    let ends_like_sentence = paragraph
        .trim_end_matches(is_closing_mark)
        .chars()
        .last()
        .map(is_closing_punctuation)
        .unwrap_or(false);
    char_len(paragraph) < STRUCTURAL_MAX_CHARS && !ends_like_sentence
}

/// 在满足 `is_delimiter` 的字符之后切开，分隔符留在前一段
///
/// 连续的句末标点和其后的闭合引号一并归入前一段。
fn split_after(text: &str, is_delimiter: fn(char) -> bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        if is_delimiter(ch) {
            while let Some(&next) = chars.peek() {
                if is_delimiter(next) || is_closing_mark(next) {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            pieces.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        pieces.push(current);
    }

    pieces
}

fn flush(current: &mut String, out: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    current.clear();
}

/// 第二层：句子贪心合并
fn pack_sentences(paragraph: &str, config: &SegmenterConfig) -> Vec<String> {
    let max = config.max_unit_chars;
    let mut out = Vec::new();
    let mut current = String::new();

    for sentence in split_after(paragraph, is_sentence_terminal) {
        let candidate = format!("{}{}", current, sentence);
        if char_len(candidate.trim()) <= max {
            current = candidate;
            continue;
        }

        flush(&mut current, &mut out);
        let sentence = sentence.trim();
        if char_len(sentence) <= max {
            current = sentence.to_string();
        } else {
            split_long_sentence(sentence, config, &mut out);
        }
    }
    flush(&mut current, &mut out);

    out
}

/// 第三层：超长句按子句切分后重新合并
fn split_long_sentence(sentence: &str, config: &SegmenterConfig, out: &mut Vec<String>) {
    let max = config.max_unit_chars;
    let mut current = String::new();

    for clause in split_after(sentence, is_clause_delimiter) {
        let candidate = format!("{}{}", current, clause);
        if char_len(candidate.trim()) <= max {
            current = candidate;
            continue;
        }

        flush(&mut current, out);
        let clause = clause.trim();
        if char_len(clause) <= max {
            current = clause.to_string();
        } else {
            split_by_length(clause, config, out);
        }
    }
    flush(&mut current, out);
}

/// 按长度硬切，优先在窗口内最后一个软断点之后断开
fn split_by_length(text: &str, config: &SegmenterConfig, out: &mut Vec<String>) {
    let max = config.max_unit_chars.max(1);
    let window_start = max.saturating_sub(config.soft_break_window);
    let chars: Vec<char> = text.chars().collect();
    let mut start = 0;

    while chars.len() - start > max {
        let rest = &chars[start..];
        let break_at = (window_start..max)
            .rev()
            .find(|&i| config.soft_breaks.contains(&rest[i]))
            .map(|i| i + 1)
            .unwrap_or(max);

        let head: String = rest[..break_at].iter().collect();
        let head = head.trim();
        if !head.is_empty() {
            out.push(head.to_string());
        }

        start += break_at;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }

    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        out.push(tail.to_string());
    }
}

/// 对文本进行分段
///
/// 确定性、全函数：任何输入都返回结果，空文本返回空序列。
pub fn segment(text: &str, config: &SegmenterConfig) -> Vec<SpeakableUnit> {
    let paragraphs = split_paragraphs(text);
    let last_paragraph = paragraphs.len().saturating_sub(1);
    let mut units: Vec<SpeakableUnit> = Vec::new();

    for (paragraph_index, paragraph) in paragraphs.iter().enumerate() {
        if is_structural(paragraph) {
            units.push(SpeakableUnit::structural(paragraph.as_str()));
            continue;
        }

        let first = units.len();
        units.extend(pack_sentences(paragraph, config).into_iter().map(SpeakableUnit::speech));

        if paragraph_index < last_paragraph && units.len() > first {
            if let Some(unit) = units.last_mut() {
                unit.mark_trailing_break();
            }
        }
    }

    for (index, unit) in units.iter().enumerate() {
        if !unit.is_structural() && unit.char_len() > config.max_unit_chars {
            tracing::error!(
                index = index,
                char_len = unit.char_len(),
                max_unit_chars = config.max_unit_chars,
                "Segmentation defect: unit exceeds length limit"
            );
        }
    }

    units
}

/// 使用默认配置分段（便捷方法）
pub fn segment_default(text: &str) -> Vec<SpeakableUnit> {
    segment(text, &SegmenterConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_heading_then_sentence() {
        let text = "第一章\n\n这是一个很长的句子，包含多个逗号和分号；它应该被正确分割成多个片段。";
        let units = segment(text, &SegmenterConfig::default());

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text(), "第一章");
        assert!(units[0].is_structural());
        assert_eq!(
            units[1].text(),
            "这是一个很长的句子，包含多个逗号和分号；它应该被正确分割成多个片段。"
        );
        assert!(!units[1].is_structural());
        assert!(!units[1].has_trailing_break());
    }

    #[test]
    fn test_empty_text() {
        assert!(segment_default("").is_empty());
        assert!(segment_default("  \n\n \t\n").is_empty());
    }

    #[test]
    fn test_bracketed_heading_is_structural_regardless_of_length() {
        let heading = format!("【{}】", "目录".repeat(80));
        let units = segment(&heading, &SegmenterConfig::default());

        assert_eq!(units.len(), 1);
        assert!(units[0].is_structural());
        assert!(units[0].char_len() > DEFAULT_MAX_UNIT_CHARS);
    }

    #[test]
    fn test_short_quoted_exclamation_is_speech() {
        let units = segment_default("\u{201C}斗之力，三段！\u{201D}");
        assert_eq!(units.len(), 1);
        assert!(!units[0].is_structural());
    }

    #[test]
    fn test_sentences_packed_within_limit() {
        let config = SegmenterConfig::default().with_max_unit_chars(10);
        let units = segment("一二三四。五六七八。九十一二。", &config);

        let texts: Vec<&str> = units.iter().map(|u| u.text()).collect();
        assert_eq!(texts, vec!["一二三四。五六七八。", "九十一二。"]);
    }

    #[test]
    fn test_english_sentences_keep_spacing() {
        let config = SegmenterConfig::default().with_max_unit_chars(32);
        let text = "This is the first sentence. And here is another one. Short.";
        let units = segment(text, &config);

        let texts: Vec<&str> = units.iter().map(|u| u.text()).collect();
        assert_eq!(
            texts,
            vec!["This is the first sentence.", "And here is another one. Short."]
        );
    }

    #[test]
    fn test_long_sentence_split_on_commas() {
        let config = SegmenterConfig::default().with_max_unit_chars(12);
        let text = "甲乙丙丁戊己，庚辛壬癸子丑，寅卯辰巳午未。";
        let units = segment(text, &config);

        let texts: Vec<&str> = units.iter().map(|u| u.text()).collect();
        assert_eq!(texts, vec!["甲乙丙丁戊己，", "庚辛壬癸子丑，", "寅卯辰巳午未。"]);
    }

    #[test]
    fn test_hard_split_prefers_last_soft_break() {
        let config = SegmenterConfig {
            max_unit_chars: 10,
            soft_break_window: 5,
            soft_breaks: vec!['的'],
        };
        // 窗口为下标 5..10，其中 '的' 出现在 6 和 8，取最后一个
        let text = "甲乙丙丁戊己的庚的辛壬癸子丑寅卯辰巳午未申酉戌亥。";
        let units = segment(text, &config);

        assert_eq!(units[0].text(), "甲乙丙丁戊己的庚的");
        for unit in &units {
            assert!(unit.char_len() <= 10, "unit too long: {}", unit.text());
        }
    }

    #[test]
    fn test_hard_split_without_soft_break_cuts_at_limit() {
        let config = SegmenterConfig {
            max_unit_chars: 8,
            soft_break_window: 3,
            soft_breaks: vec!['、'],
        };
        let text = "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyz.";
        let units = segment(text, &config);

        assert_eq!(units[0].text(), "abcdefgh");
        assert_eq!(non_whitespace(&units.iter().map(|u| u.text()).collect::<String>()), text);
    }

    #[test]
    fn test_paragraph_breaks_marked() {
        let text = "第一段第一句。第一段第二句。\n\n第二段的内容在这里结束了。\n\n最后一段也是完整的句子。";
        let units = segment_default(text);

        assert_eq!(units.len(), 3);
        assert!(units[0].has_trailing_break());
        assert!(units[1].has_trailing_break());
        assert!(!units[2].has_trailing_break());
    }

    #[test]
    fn test_structural_paragraph_has_no_trailing_break() {
        let units = segment_default("序章\n\n正文开始于此处。");
        assert!(units[0].is_structural());
        assert!(!units[0].has_trailing_break());
    }

    #[test]
    fn test_lines_within_paragraph_are_joined() {
        let units = segment_default("这一段被\n硬换行切开了，但它仍然是同一段落。");
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text(), "这一段被 硬换行切开了，但它仍然是同一段落。");
    }

    fn assert_invariants(text: &str, config: &SegmenterConfig) {
        let units = segment(text, config);
        for unit in &units {
            assert!(!unit.text().trim().is_empty(), "empty unit for {:?}", text);
            assert!(
                unit.is_structural() || unit.char_len() <= config.max_unit_chars,
                "unit of {} chars exceeds {}: {:?}",
                unit.char_len(),
                config.max_unit_chars,
                unit.text()
            );
        }
        let joined: String = units.iter().map(|u| u.text()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(text), "lossy on {:?}", text);
    }

    #[test]
    fn test_length_invariant_and_lossless_on_awkward_inputs() {
        let long_paragraph = format!("{}；{}", "甲".repeat(48), "乙".repeat(120));
        let cases: Vec<(String, usize, usize)> = vec![
            ("，".repeat(400), 150, 20),
            (",".repeat(90), 30, 20),
            ("abcdefghijklmnopqrstuvwxyz".repeat(20), 150, 20),
            ("Lorem ipsum dolor sit amet ".repeat(30), 40, 20),
            ("前半句；后半句;又一句；".repeat(30), 25, 20),
            (format!("{}；", "字".repeat(48)), 150, 20),
            (format!("{}；\n\n{}", "字".repeat(48), "正文。".repeat(60)), 20, 20),
            (long_paragraph, 50, 20),
            ("一二三四五六七八九十的".repeat(30), 21, 20),
            ("一二三四五六七八九十的".repeat(30), 5, 20),
            ("一二三四五六七八九十".repeat(5), 1, 20),
            ("。！？\n\n\n   \t\n！".to_string(), 2, 20),
        ];

        for (text, max_unit_chars, soft_break_window) in cases {
            let config = SegmenterConfig {
                max_unit_chars,
                soft_break_window,
                soft_breaks: DEFAULT_SOFT_BREAKS.to_vec(),
            };
            assert_invariants(&text, &config);
        }
    }

    #[test]
    fn test_length_invariant_and_lossless_on_chapter_sample() {
        let config = SegmenterConfig::default().with_max_unit_chars(40);
        let text = r#"第001章 陨落的天才

"斗之力，三段！"

望着测验魔石碑上面闪亮得甚至有些刺眼的五个大字，少年面无表情，唇角有着一抹自嘲，紧握的手掌，因为大力，而导致略微尖锐的指甲深深的刺进了掌心之中，带来一阵阵钻心的疼痛。

"三段？嘿嘿，果然不出我所料，这个"天才"这一年又是在原地踏步！"

一段没有任何标点而且非常非常长的文字用来测试按长度切分的逻辑是否能够在软断点的位置断开而不是在词语的中间断开以及在没有软断点的时候是否能够在上限处直接切开"#;

        let units = segment(text, &config);

        for unit in &units {
            assert!(!unit.text().trim().is_empty());
            assert!(
                unit.is_structural() || unit.char_len() <= 40,
                "unit exceeds limit: {}",
                unit.text()
            );
        }

        let joined: String = units.iter().map(|u| u.text()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(text));
        assert!(units[0].is_structural());
    }
}
