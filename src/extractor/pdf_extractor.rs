use std::fs;
use std::path::Path;

use super::chapter_detector::ChapterDetector;
use super::{Chapter, ExtractError, Extractor, PageRange};

/// PDF 提取器
///
/// 仅支持含文本层的 PDF。扫描版 PDF 没有可提取的文本，
/// 结果退化为空章节列表而不是报错
#[derive(Clone)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// 创建新的 PDF 提取器实例
    pub fn new() -> Self {
        Self
    }

    /// 提取文本层
    ///
    /// # 参数
    /// - `bytes`: PDF 文件字节
    /// - `page_range`: 可选的页码范围（从 1 开始计数，闭区间）
    ///
    /// # 返回
    /// 提取出的纯文本。指定页码范围时逐页提取后拼接，页边界以
    /// 空行分隔；超出文档范围的页码被忽略
    fn extract_text(
        &self,
        bytes: &[u8],
        page_range: Option<&PageRange>,
    ) -> Result<String, ExtractError> {
        match page_range {
            Some(range) => {
                let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
                    .map_err(|e| ExtractError::Pdf(e.to_string()))?;
                let selected: Vec<&str> = pages
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| range.contains(*i + 1))
                    .map(|(_, text)| text.as_str())
                    .collect();
                Ok(selected.join("\n\n"))
            }
            None => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| ExtractError::Pdf(e.to_string())),
        }
    }
}

impl Extractor for PdfExtractor {
    fn extract(
        &self,
        file_path: &Path,
        page_range: Option<&PageRange>,
    ) -> Result<Vec<Chapter>, ExtractError> {
        // 读取文件字节
        let bytes = fs::read(file_path)?;
        let text = self.extract_text(&bytes, page_range)?;

        // 扫描版 PDF 或页码范围未命中任何内容：没有文本层可用，
        // 返回空结果，调用方据此与硬失败区分
        if text.trim().is_empty() {
            log::warn!("未提取到任何文本: {}", file_path.display());
            return Ok(Vec::new());
        }

        let detector = ChapterDetector::new();
        Ok(detector.detect(&text))
    }

    fn supported_extensions(&self) -> Vec<&str> {
        vec!["pdf"]
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}
