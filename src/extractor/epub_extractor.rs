use std::collections::HashMap;
use std::path::Path;

use epub::doc::EpubDoc;
use scraper::{Html, Selector};

use super::{Chapter, ExtractError, Extractor, PageRange, Section};

/// 每个节标题向后收集元素的上限
///
/// 超出上限的内容被静默截断，不报错
const SECTION_SCAN_LIMIT: usize = 50;

/// 章级与节级标题标签
///
/// 由词频分析得到：同一本书中节比章多，出现次数较多的标签
/// 视为节级，较少的视为章级
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingLevels {
    /// 章级标题标签（如 "h2"）
    pub chapter_level: String,
    /// 节级标题标签（如 "h3"）
    pub section_level: String,
}

/// EPUB 提取器
///
/// 两遍扫描：第一遍统计标题标签词频确定章/节层级，
/// 第二遍按判定的层级切分每个文档单元
#[derive(Clone)]
pub struct EpubExtractor;

impl EpubExtractor {
    /// 创建新的 EPUB 提取器实例
    pub fn new() -> Self {
        Self
    }

    /// 第一遍：统计全书标题标签词频，判定章级与节级标签
    ///
    /// # 参数
    /// - `units`: 全书文档单元的 HTML 内容，按阅读顺序排列
    ///
    /// # 返回
    /// 章/节层级判定结果；全书出现的标题标签不足 2 种时返回
    /// `InsufficientStructure`，不做单层级猜测
    pub fn classify_heading_levels(&self, units: &[String]) -> Result<HeadingLevels, ExtractError> {
        let heading_selector = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();

        // 词频表 + 首次出现顺序，计数并列时按首次出现取舍，保证结果可复现
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut first_seen: Vec<String> = Vec::new();

        for html in units {
            let document = Html::parse_document(html);
            for element in document.select(&heading_selector) {
                let tag = element.value().name().to_string();
                if !counts.contains_key(&tag) {
                    first_seen.push(tag.clone());
                }
                *counts.entry(tag).or_insert(0) += 1;
            }
        }

        if counts.len() < 2 {
            return Err(ExtractError::InsufficientStructure {
                found: counts.len(),
            });
        }

        // 词频降序；稳定排序保证并列时保持首次出现顺序
        let mut ranked = first_seen;
        ranked.sort_by(|a, b| counts[b].cmp(&counts[a]));

        Ok(HeadingLevels {
            section_level: ranked[0].clone(),
            chapter_level: ranked[1].clone(),
        })
    }

    /// 第二遍：按章/节层级切分单个文档单元
    ///
    /// # 参数
    /// - `html`: 文档单元的 HTML 内容
    /// - `levels`: 第一遍判定的章/节层级
    ///
    /// # 返回
    /// 该单元对应的章节；单元内没有章级标题或切不出任何节时
    /// 返回 None，该单元不产出章节
    pub fn extract_unit_chapter(&self, html: &str, levels: &HeadingLevels) -> Option<Chapter> {
        let document = Html::parse_document(html);

        // 章标题：单元内全部章级标题文本以 " - " 连接
        let chapter_selector = Selector::parse(&levels.chapter_level).unwrap();
        let titles: Vec<String> = document
            .select(&chapter_selector)
            .map(|e| e.text().collect::<String>().trim().to_string())
            .collect();
        let chapter_title = capitalize_first(titles.join(" - ").trim());
        if chapter_title.is_empty() {
            return None;
        }

        // 将节级标题与段落平铺为文档顺序的序列
        let flat_selector = Selector::parse(&format!("{}, p", levels.section_level)).unwrap();
        let mut nodes: Vec<(bool, String)> = Vec::new();
        for element in document.select(&flat_selector) {
            let is_heading = element.value().name() == levels.section_level;
            nodes.push((is_heading, element.text().collect::<String>()));
        }

        let mut sections = Vec::new();
        for i in 0..nodes.len() {
            let (is_heading, text) = &nodes[i];
            if !*is_heading {
                continue;
            }

            // 从当前节标题向后收集段落，遇到下一个节标题或达到
            // 扫描上限即停止；最后一个节标题没有停止条件，收满上限为止
            let mut paragraphs = Vec::new();
            let mut scanned = 0;
            for (next_is_heading, next_text) in nodes.iter().skip(i + 1) {
                if scanned >= SECTION_SCAN_LIMIT {
                    break;
                }
                scanned += 1;
                if *next_is_heading {
                    break;
                }
                paragraphs.push(next_text.trim().to_string());
            }

            sections.push(Section::new(text.trim(), paragraphs));
        }

        // 切不出节的单元整体丢弃
        if sections.is_empty() {
            return None;
        }

        Some(Chapter::new(chapter_title, sections))
    }

    /// 对全书文档单元执行两遍扫描，产出章节列表
    ///
    /// # 参数
    /// - `units`: 全书文档单元的 HTML 内容，按阅读顺序排列
    ///
    /// # 返回
    /// 按单元顺序排列的章节列表
    pub fn extract_from_units(&self, units: &[String]) -> Result<Vec<Chapter>, ExtractError> {
        let levels = self.classify_heading_levels(units)?;
        log::debug!(
            "标题层级判定: 章级={} 节级={}",
            levels.chapter_level,
            levels.section_level
        );

        let mut chapters = Vec::new();
        for html in units {
            if let Some(chapter) = self.extract_unit_chapter(html, &levels) {
                chapters.push(chapter);
            }
        }

        Ok(chapters)
    }
}

impl Extractor for EpubExtractor {
    fn extract(
        &self,
        file_path: &Path,
        page_range: Option<&PageRange>,
    ) -> Result<Vec<Chapter>, ExtractError> {
        // 页码范围仅对 PDF 有意义，在任何提取开始前拒绝
        if page_range.is_some() {
            return Err(ExtractError::PageRangeUnsupported);
        }

        // 打开 EPUB 文件
        let mut doc = EpubDoc::new(file_path).map_err(|e| ExtractError::Epub(e.to_string()))?;

        // 按阅读顺序取出全部文档单元的 HTML 内容
        let mut units = Vec::new();
        let num_units = doc.get_num_chapters();
        for i in 0..num_units {
            if !doc.set_current_chapter(i) {
                continue;
            }
            if let Some((html, _mime)) = doc.get_current_str() {
                units.push(html);
            }
        }

        self.extract_from_units(&units)
    }

    fn supported_extensions(&self) -> Vec<&str> {
        vec!["epub"]
    }
}

impl Default for EpubExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 将首字符转为大写，其余字符保持不变
fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
