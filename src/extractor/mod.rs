use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// 子模块声明
pub mod chapter_detector;
pub mod epub_extractor;
pub mod pdf_extractor;

/// 小节数据
///
/// 章节内的一个小节，包含标题和按原文顺序排列的段落
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// 小节标题（可能为空，或由启发式推断得到）
    pub name: String,
    /// 段落列表（保持原文顺序）
    pub paragraphs: Vec<String>,
}

impl Section {
    /// 创建新的小节
    pub fn new(name: impl Into<String>, paragraphs: Vec<String>) -> Self {
        Self {
            name: name.into(),
            paragraphs,
        }
    }
}

impl fmt::Display for Section {
    // 小节的文本形式：段落之间以空行分隔
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.paragraphs.join("\n\n"))
    }
}

/// 章节数据
///
/// 顶层结构单元，包含章标题和按原文顺序排列的小节
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// 章节标题
    pub name: String,
    /// 小节列表（保持原文顺序）
    pub sections: Vec<Section>,
}

impl Chapter {
    /// 创建新的章节
    pub fn new(name: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            name: name.into(),
            sections,
        }
    }
}

/// 页码范围
///
/// 闭区间，页码从 1 开始计数。"12-40" 表示第 12 页到第 40 页
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    /// 起始页
    pub start: usize,
    /// 结束页
    pub end: usize,
}

impl PageRange {
    /// 检查页码是否落在范围内
    pub fn contains(&self, page: usize) -> bool {
        page >= self.start && page <= self.end
    }
}

impl FromStr for PageRange {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '-');
        let start = parts.next().and_then(|p| p.trim().parse().ok());
        let end = parts.next().and_then(|p| p.trim().parse().ok());

        match (start, end) {
            (Some(start), Some(end)) => Ok(Self { start, end }),
            _ => Err(ExtractError::InvalidPageRange(s.to_string())),
        }
    }
}

/// 提取错误
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("无法识别文件扩展名: {0}")]
    MissingExtension(String),
    #[error("不支持的文件格式: {0}")]
    UnsupportedFormat(String),
    #[error("EPUB 文件不支持页码范围")]
    PageRangeUnsupported,
    #[error("页码范围格式无效: {0}，应为 \"起始页-结束页\"")]
    InvalidPageRange(String),
    #[error("标题结构不足: 全书只发现 {found} 种标题标签，至少需要 2 种")]
    InsufficientStructure { found: usize },
    #[error("EPUB 解析错误: {0}")]
    Epub(String),
    #[error("PDF 解析失败: {0}")]
    Pdf(String),
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),
}

/// Extractor trait
///
/// 所有格式提取器必须实现此 trait
pub trait Extractor: Send + Sync {
    /// 从文件中提取章节结构
    ///
    /// # 参数
    /// - `file_path`: 要提取的文件路径
    /// - `page_range`: 可选的页码范围（仅 PDF 支持）
    ///
    /// # 返回
    /// 按原文顺序排列的章节列表
    fn extract(
        &self,
        file_path: &Path,
        page_range: Option<&PageRange>,
    ) -> Result<Vec<Chapter>, ExtractError>;

    /// 获取支持的文件扩展名列表
    fn supported_extensions(&self) -> Vec<&str>;
}

/// Extractor 路由器
///
/// 根据文件扩展名路由到对应的提取器
pub struct ExtractorRouter {
    /// 扩展名到提取器的映射
    extractors: HashMap<String, Box<dyn Extractor>>,
}

impl ExtractorRouter {
    /// 创建新的路由器实例
    ///
    /// 注册所有可用的提取器
    pub fn new() -> Self {
        let mut extractors: HashMap<String, Box<dyn Extractor>> = HashMap::new();

        // 注册 EPUB 提取器
        let epub = Box::new(epub_extractor::EpubExtractor::new());
        for ext in epub.supported_extensions() {
            extractors.insert(ext.to_string(), epub.clone());
        }

        // 注册 PDF 提取器
        let pdf = Box::new(pdf_extractor::PdfExtractor::new());
        for ext in pdf.supported_extensions() {
            extractors.insert(ext.to_string(), pdf.clone());
        }

        Self { extractors }
    }

    /// 根据文件路径路由到对应的提取器
    ///
    /// # 参数
    /// - `file_path`: 文件路径
    ///
    /// # 返回
    /// 对应的提取器引用，如果不支持该格式则返回错误
    pub fn route(&self, file_path: &Path) -> Result<&dyn Extractor, ExtractError> {
        let ext = file_path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ExtractError::MissingExtension(file_path.display().to_string()))?
            .to_lowercase();

        self.extractors
            .get(&ext)
            .map(|e| e.as_ref())
            .ok_or(ExtractError::UnsupportedFormat(ext))
    }

    /// 获取所有支持的文件扩展名
    pub fn supported_extensions(&self) -> Vec<String> {
        self.extractors.keys().cloned().collect()
    }

    /// 检查是否支持指定的文件扩展名
    pub fn supports(&self, extension: &str) -> bool {
        self.extractors.contains_key(&extension.to_lowercase())
    }
}

impl Default for ExtractorRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// 提取入口
///
/// 根据文件扩展名分发到对应的提取器
///
/// # 参数
/// - `file_path`: 输入文件路径（.epub 或 .pdf）
/// - `page_range`: 可选的页码范围，仅 PDF 输入有效
///
/// # 返回
/// 按原文顺序排列的章节列表
pub fn extract_chapters(
    file_path: &Path,
    page_range: Option<&PageRange>,
) -> Result<Vec<Chapter>, ExtractError> {
    let router = ExtractorRouter::new();
    let extractor = router.route(file_path)?;

    log::info!("开始提取章节: {}", file_path.display());
    let chapters = extractor.extract(file_path, page_range)?;
    log::info!("提取完成: {} 个章节", chapters.len());

    Ok(chapters)
}
