use regex::Regex;

use super::{Chapter, Section};

/// 正文段落的最小词数
///
/// 少于该词数且并非全大写的文本块视为噪声（页眉、页脚、页码等）
const MIN_PARAGRAPH_WORDS: usize = 8;

/// 章节检测器
///
/// 对 PDF 文本层执行三段式启发推断：
/// 1. 段落重建：按空行切块、还原硬换行、合并被打断的段落
/// 2. 节切分：以全大写的段首词为节边界
/// 3. 章切分：以纯数字开头的节为章边界
pub struct ChapterDetector {
    /// 章边界的纯数字标记
    numeric_token: Regex,
}

impl ChapterDetector {
    /// 创建新的章节检测器实例
    pub fn new() -> Self {
        Self {
            numeric_token: Regex::new(r"^\d+$").unwrap(),
        }
    }

    /// 综合检测：从原始文本到章节列表
    ///
    /// # 参数
    /// - `text`: PDF 文本层的原始文本
    ///
    /// # 返回
    /// 按原文顺序排列的章节列表；文本为空时返回空列表
    pub fn detect(&self, text: &str) -> Vec<Chapter> {
        let paragraphs = self.normalize_paragraphs(text);
        let sections = self.detect_sections(paragraphs);
        self.detect_chapters(sections)
    }

    /// 段落重建：切块、去噪、合并断段
    ///
    /// # 参数
    /// - `text`: 原始文本
    ///
    /// # 返回
    /// 按原文顺序排列的干净段落
    pub fn normalize_paragraphs(&self, text: &str) -> Vec<String> {
        let mut kept = Vec::new();

        for block in text.split("\n\n") {
            // 将文本层的硬换行还原为空格
            let paragraph = block.split('\n').collect::<Vec<_>>().join(" ");
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }

            // 全大写的块是标题候选，无论长短都保留；
            // 其余的块低于词数下限时按噪声丢弃
            let all_upper = words.iter().all(|w| is_upper_word(w));
            if !all_upper && words.len() < MIN_PARAGRAPH_WORDS {
                continue;
            }

            kept.push(paragraph);
        }

        self.merge_continuations(kept)
    }

    /// 合并被分页/分栏打断的段落
    ///
    /// 从后向前扫描：以小写字母开头的段落是前一段的延续，
    /// 以空格拼接进前一段后从序列中移除，结果不留空位
    pub fn merge_continuations(&self, mut paragraphs: Vec<String>) -> Vec<String> {
        for i in (1..paragraphs.len()).rev() {
            let continues = paragraphs[i]
                .chars()
                .next()
                .map_or(false, |c| c.is_lowercase());
            if continues {
                let tail = std::mem::take(&mut paragraphs[i]);
                paragraphs[i - 1].push(' ');
                paragraphs[i - 1].push_str(&tail);
            }
        }

        paragraphs.retain(|p| !p.is_empty());
        paragraphs
    }

    /// 节切分：以全大写的段首词为节边界
    ///
    /// 触发段本身作为新节的第一个正文段落；首个边界之前的段落
    /// 构成起始节（其标题可能为空）。任何段落都不会被丢弃，
    /// 每个段落恰好归属一个节
    ///
    /// # 参数
    /// - `paragraphs`: 重建后的段落序列
    ///
    /// # 返回
    /// 按原文顺序排列的节列表
    pub fn detect_sections(&self, paragraphs: Vec<String>) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut current: Vec<String> = Vec::new();

        for paragraph in paragraphs {
            if self.opens_section(&paragraph) {
                if !current.is_empty() {
                    sections.push(self.build_section(current));
                }
                current = vec![paragraph];
            } else {
                current.push(paragraph);
            }
        }

        if !current.is_empty() {
            sections.push(self.build_section(current));
        }

        sections
    }

    /// 判断段落是否开启一个新节
    ///
    /// 段首词须全大写且长度不小于 2。单字母词（"A"、"I"）是普通
    /// 句首，不构成节边界
    fn opens_section(&self, paragraph: &str) -> bool {
        match paragraph.split_whitespace().next() {
            Some(word) => word.chars().count() > 1 && is_upper_word(word),
            None => false,
        }
    }

    /// 从节的第一个段落推断节标题
    ///
    /// 连续取段首的全大写词，遇到第一个非全大写词即停止
    fn extract_section_name(&self, paragraph: &str) -> String {
        let mut name = String::new();
        for word in paragraph.split(' ') {
            if is_upper_word(word) {
                name.push_str(word);
                name.push(' ');
            } else {
                break;
            }
        }
        name
    }

    fn build_section(&self, paragraphs: Vec<String>) -> Section {
        let name = self.extract_section_name(&paragraphs[0]);
        Section::new(name, paragraphs)
    }

    /// 章切分：渲染文本以纯数字开头的节为章边界
    ///
    /// 节序列被切成连续区间，每个区间的第一个节提供章标题
    /// （其完整渲染文本，去除首尾空白），其余节构成章的正文。
    /// 只含一个节的区间产出有标题、零节的章：标题提取优先于节保留
    ///
    /// # 参数
    /// - `sections`: 节序列
    ///
    /// # 返回
    /// 按区间顺序排列的章节列表
    pub fn detect_chapters(&self, sections: Vec<Section>) -> Vec<Chapter> {
        let mut chapters = Vec::new();
        let mut run: Vec<Section> = Vec::new();

        for section in sections {
            if self.opens_chapter(&section) {
                if !run.is_empty() {
                    chapters.push(self.build_chapter(run));
                }
                run = vec![section];
            } else {
                run.push(section);
            }
        }

        if !run.is_empty() {
            chapters.push(self.build_chapter(run));
        }

        chapters
    }

    /// 判断节是否开启一个新章：渲染文本的第一个词是纯数字
    fn opens_chapter(&self, section: &Section) -> bool {
        let text = section.to_string();
        match text.split_whitespace().next() {
            Some(token) => self.numeric_token.is_match(token),
            None => false,
        }
    }

    fn build_chapter(&self, mut run: Vec<Section>) -> Chapter {
        let name = run[0].to_string().trim().to_string();
        let sections = run.split_off(1);
        Chapter::new(name, sections)
    }
}

impl Default for ChapterDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// 判断一个词是否全大写
///
/// 至少包含一个大写字母，且不含任何小写字母；数字、标点等
/// 无大小写的字符不参与判断
fn is_upper_word(word: &str) -> bool {
    let mut has_upper = false;
    for c in word.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_upper = true;
        }
    }
    has_upper
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraphs(items: &[&str]) -> Vec<String> {
        items.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_is_upper_word() {
        assert!(is_upper_word("INTRODUCTION"));
        assert!(is_upper_word("A"));
        assert!(is_upper_word("DON'T"));
        assert!(is_upper_word("II."));
        assert!(!is_upper_word("Mixed"));
        assert!(!is_upper_word("lower"));
        assert!(!is_upper_word("123"));
        assert!(!is_upper_word(""));
    }

    #[test]
    fn test_normalize_rejoins_wrapped_lines() {
        let detector = ChapterDetector::new();
        let text = "This paragraph was wrapped\nacross three source lines\nby the text layer of the file.";
        let result = detector.normalize_paragraphs(text);

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0],
            "This paragraph was wrapped across three source lines by the text layer of the file."
        );
    }

    #[test]
    fn test_normalize_drops_short_noise() {
        let detector = ChapterDetector::new();
        let text = "Page 12\n\nA proper body paragraph that has more than eight words in it.";
        let result = detector.normalize_paragraphs(text);

        assert_eq!(result.len(), 1);
        assert!(result[0].starts_with("A proper body paragraph"));
    }

    #[test]
    fn test_normalize_keeps_all_caps_blocks() {
        // 全大写的块是标题候选，长度不限
        let detector = ChapterDetector::new();
        let text = "TABLE OF CONTENTS\n\nBody text follows here with enough words to be kept around.";
        let result = detector.normalize_paragraphs(text);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], "TABLE OF CONTENTS");
    }

    #[test]
    fn test_merge_continuations() {
        let detector = ChapterDetector::new();
        let result = detector.merge_continuations(paragraphs(&[
            "ALL CAPS TITLE",
            "continues in lower case after break",
            "A normal paragraph with at least eight words here now",
        ]));

        assert_eq!(result.len(), 2);
        assert_eq!(result[0], "ALL CAPS TITLE continues in lower case after break");
        assert_eq!(
            result[1],
            "A normal paragraph with at least eight words here now"
        );
    }

    #[test]
    fn test_merge_continuations_cascade() {
        // 连续多个小写开头的段落逐段向前归并
        let detector = ChapterDetector::new();
        let result = detector.merge_continuations(paragraphs(&[
            "The sentence starts here",
            "carries over a page break",
            "and even a second one.",
        ]));

        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0],
            "The sentence starts here carries over a page break and even a second one."
        );
    }

    #[test]
    fn test_normalize_merges_across_page_break() {
        let detector = ChapterDetector::new();
        let text = "The first half of a sentence that was split by a page\n\nboundary and then kept going with plenty of words after it.";
        let result = detector.normalize_paragraphs(text);

        assert_eq!(result.len(), 1);
        assert!(result[0].starts_with("The first half"));
        assert!(result[0].ends_with("after it."));
    }

    #[test]
    fn test_normalize_empty_text() {
        let detector = ChapterDetector::new();
        assert!(detector.normalize_paragraphs("").is_empty());
        assert!(detector.normalize_paragraphs("   \n\n  \n  ").is_empty());
    }

    #[test]
    fn test_detect_sections() {
        let detector = ChapterDetector::new();
        let sections = detector.detect_sections(paragraphs(&[
            "INTRODUCTION to the topic and more words",
            "A continuing paragraph",
            "SECTION TWO begins here with words",
        ]));

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "INTRODUCTION ");
        assert_eq!(
            sections[0].paragraphs,
            vec![
                "INTRODUCTION to the topic and more words",
                "A continuing paragraph"
            ]
        );
        assert_eq!(sections[1].name, "SECTION TWO ");
        assert_eq!(
            sections[1].paragraphs,
            vec!["SECTION TWO begins here with words"]
        );
    }

    #[test]
    fn test_single_letter_word_does_not_open_section() {
        // "A" 是普通句首而不是节边界
        let detector = ChapterDetector::new();
        let sections = detector.detect_sections(paragraphs(&[
            "A day like any other day in the town",
            "I walked to the harbor before sunrise that morning",
        ]));

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].paragraphs.len(), 2);
    }

    #[test]
    fn test_leading_paragraphs_form_initial_section() {
        // 首个边界之前的段落构成起始节，标题为空
        let detector = ChapterDetector::new();
        let sections = detector.detect_sections(paragraphs(&[
            "Opening text before any heading appears",
            "HEADING starts the first titled section",
        ]));

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "");
        assert_eq!(
            sections[0].paragraphs,
            vec!["Opening text before any heading appears"]
        );
        assert_eq!(sections[1].name, "HEADING ");
    }

    #[test]
    fn test_no_paragraph_dropped_in_sections() {
        let detector = ChapterDetector::new();
        let input = paragraphs(&[
            "Leading text with no heading at all",
            "FIRST heading paragraph",
            "body one",
            "SECOND heading paragraph",
            "body two",
            "body three",
        ]);
        let total = input.len();

        let sections = detector.detect_sections(input);
        let assigned: usize = sections.iter().map(|s| s.paragraphs.len()).sum();
        assert_eq!(assigned, total);
    }

    #[test]
    fn test_section_name_consumes_leading_caps() {
        let detector = ChapterDetector::new();
        assert_eq!(
            detector.extract_section_name("SECTION TWO begins here"),
            "SECTION TWO "
        );
        assert_eq!(detector.extract_section_name("no caps at all"), "");
        assert_eq!(
            detector.extract_section_name("WHAT I SAW that day"),
            "WHAT I SAW "
        );
    }

    #[test]
    fn test_detect_chapters_numeric_boundary() {
        let detector = ChapterDetector::new();
        let sections = vec![
            Section::new("", vec!["1 THE FIRST CHAPTER".to_string()]),
            Section::new("ONE ", vec!["ONE body of the first section".to_string()]),
            Section::new("TWO ", vec!["TWO body of the second section".to_string()]),
            Section::new("", vec!["2 THE SECOND CHAPTER".to_string()]),
            Section::new("THREE ", vec!["THREE body of the third section".to_string()]),
        ];

        let chapters = detector.detect_chapters(sections);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].name, "1 THE FIRST CHAPTER");
        assert_eq!(chapters[0].sections.len(), 2);
        assert_eq!(chapters[1].name, "2 THE SECOND CHAPTER");
        assert_eq!(chapters[1].sections.len(), 1);
    }

    #[test]
    fn test_single_section_run_yields_empty_chapter() {
        // 只含一个节的区间：该节的文本成为章标题，章内没有节
        let detector = ChapterDetector::new();
        let sections = vec![Section::new(
            "",
            vec!["1 A LONE CHAPTER HEADING".to_string()],
        )];

        let chapters = detector.detect_chapters(sections);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].name, "1 A LONE CHAPTER HEADING");
        assert!(chapters[0].sections.is_empty());
    }

    #[test]
    fn test_sections_before_first_boundary_form_leading_chapter() {
        let detector = ChapterDetector::new();
        let sections = vec![
            Section::new("PREFACE ", vec!["PREFACE text of the preface".to_string()]),
            Section::new("", vec!["1 THE REAL START".to_string()]),
            Section::new("ONE ", vec!["ONE first body section".to_string()]),
        ];

        let chapters = detector.detect_chapters(sections);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].name, "PREFACE text of the preface");
        assert!(chapters[0].sections.is_empty());
        assert_eq!(chapters[1].name, "1 THE REAL START");
        assert_eq!(chapters[1].sections.len(), 1);
    }

    #[test]
    fn test_detect_full_pipeline() {
        // 起始节以数字开头：它成为章标题，后续节构成章的正文
        let detector = ChapterDetector::new();
        let text = "1 The Fall of the House and Other Tales\n\nDURING the whole of a dull dark and\nsoundless day in the autumn of the year I had been passing alone through a dreary tract.\n\nAt length I found myself within view of the melancholy house as evening drew on.";

        let chapters = detector.detect(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].name, "1 The Fall of the House and Other Tales");
        assert_eq!(chapters[0].sections.len(), 1);
        assert_eq!(chapters[0].sections[0].name, "DURING ");
        assert_eq!(chapters[0].sections[0].paragraphs.len(), 2);
        assert!(chapters[0].sections[0].paragraphs[0]
            .starts_with("DURING the whole of a dull dark and soundless day"));
    }

    #[test]
    fn test_detect_without_numeric_boundary_yields_single_chapter() {
        // 没有任何数字边界时，第一个节整体成为章标题
        let detector = ChapterDetector::new();
        let text = "INTRODUCTION The opening section explains the purpose of the book in detail.\n\nMETHODS The second section describes how the work was carried out over time.";

        let chapters = detector.detect(text);
        assert_eq!(chapters.len(), 1);
        assert_eq!(
            chapters[0].name,
            "INTRODUCTION The opening section explains the purpose of the book in detail."
        );
        assert_eq!(chapters[0].sections.len(), 1);
        assert_eq!(chapters[0].sections[0].name, "METHODS ");
    }

    #[test]
    fn test_detect_empty_text() {
        let detector = ChapterDetector::new();
        assert!(detector.detect("").is_empty());
    }
}
