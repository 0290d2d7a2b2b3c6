use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::summarizer::ChapterSummary;

/// 输出错误
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("无法识别输出文件扩展名: {0}")]
    MissingExtension(String),
    #[error("不支持的输出格式: {0}")]
    UnsupportedFormat(String),
    #[error("写入输出文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("序列化输出失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 将摘要结果写入输出文件
///
/// 根据扩展名选择格式：.json 输出完整结构，.md 输出可读的
/// 章节摘要文档
///
/// # 参数
/// - `output_path`: 输出文件路径
/// - `chapters`: 摘要结果
pub fn write_summaries(output_path: &Path, chapters: &[ChapterSummary]) -> Result<(), WriteError> {
    let ext = output_path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| WriteError::MissingExtension(output_path.display().to_string()))?
        .to_lowercase();

    log::info!("写入输出文件: {}", output_path.display());
    match ext.as_str() {
        "json" => write_json(output_path, chapters),
        "md" => write_markdown(output_path, chapters),
        _ => Err(WriteError::UnsupportedFormat(ext)),
    }
}

/// JSON 输出：完整的摘要结构
fn write_json(path: &Path, chapters: &[ChapterSummary]) -> Result<(), WriteError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), chapters)?;
    Ok(())
}

/// Markdown 输出：章标题、节标题与摘要正文
fn write_markdown(path: &Path, chapters: &[ChapterSummary]) -> Result<(), WriteError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    for chapter in chapters {
        write!(writer, "# {}\n\n", chapter.name)?;
        for section in &chapter.sections {
            write!(writer, "## {}\n", section.name)?;
            write!(writer, "{}\n\n", section.summary)?;
            write!(writer, "\n\n")?;
        }
    }

    writer.flush()?;
    Ok(())
}
