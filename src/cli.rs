use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;

use crate::extractor::{self, PageRange};
use crate::output;
use crate::summarizer::{self, Summarizer};

/// Book Digest - 提取书籍章节结构并生成逐节摘要
#[derive(Parser, Debug)]
#[command(name = "book-digest", version, about)]
pub struct Cli {
    /// 输入文件路径（.epub 或 .pdf）
    pub input_path: PathBuf,

    /// 页码范围，仅 PDF 有效，闭区间。示例: 12-40
    #[arg(long)]
    pub pages: Option<String>,

    /// 输出文件路径（.json 或 .md）；省略时只输出日志
    #[arg(long)]
    pub output_path: Option<PathBuf>,

    /// 是否只保留重要小节的摘要
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub only_important: bool,

    /// 超长小节是否允许拆分后分段摘要
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub allow_splitting: bool,

    /// 是否在摘要后输出聚合统计
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub synthesize: bool,
}

/// 运行完整流程：提取 -> 摘要 -> 写出
pub fn run(cli: Cli) -> anyhow::Result<()> {
    // 摘要器依赖 API Key，在提取开始前校验
    let summarizer = Summarizer::from_env()?;

    let page_range = match cli.pages.as_deref() {
        Some(pages) => Some(PageRange::from_str(pages)?),
        None => None,
    };

    let chapters = extractor::extract_chapters(&cli.input_path, page_range.as_ref())?;

    let summaries = summarizer::summarize_chapters(
        &summarizer,
        &chapters,
        cli.synthesize,
        cli.allow_splitting,
        cli.only_important,
    );

    if let Some(output_path) = &cli.output_path {
        output::write_summaries(output_path, &summaries)
            .with_context(|| format!("写入 {} 失败", output_path.display()))?;
    }

    Ok(())
}
