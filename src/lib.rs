// 子模块声明
pub mod cli;
pub mod extractor;
pub mod output;
pub mod summarizer;

pub use extractor::{extract_chapters, Chapter, ExtractError, PageRange, Section};
pub use summarizer::{summarize_chapters, ChapterSummary, SectionSummary, Summarizer};
