use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::extractor::{Chapter, Section};

/// 单次摘要请求的 token 预算
const MAX_TOKENS: usize = 3000;
/// 摘要使用的模型
const MODEL_NAME: &str = "gpt-3.5-turbo";
/// Chat Completions 接口地址
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 摘要系统提示词
const SUMMARIZER_PROMPT: &str = "Generate a summary of the text.";

/// 重要性分类系统提示词
const IMPORTANCE_CLASSIFIER_PROMPT: &str = "You are a bot whose job is to identify which sections of a text \
provide useful information that doesn't involve irrelevant background about author. Just give a \
single word answer of 'yes' or 'no'.";

/// 摘要失败时的占位文本
///
/// has_errors 的词面检测依赖该文本中的 "sorry" 与 "summarize"
const FAILED_SUMMARY: &str = "Sorry, I could not summarize this section.";

/// 摘要错误
#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("OPENAI_API_KEY 环境变量未设置")]
    MissingApiKey,
    #[error("请求摘要接口失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("摘要接口响应格式异常")]
    MalformedResponse,
}

/// 单个小节的摘要结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionSummary {
    /// 小节标题
    pub name: String,
    /// 摘要文本
    pub summary: String,
    /// 摘要是否失败
    pub has_errors: bool,
    /// 小节内容是否有用（重要性分类结果）
    pub useful: bool,
}

/// 单个章节的摘要结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSummary {
    /// 章节标题
    pub name: String,
    /// 各小节的摘要
    pub sections: Vec<SectionSummary>,
}

/// 摘要器
///
/// 调用 Chat Completions 接口逐节生成摘要与重要性判定
pub struct Summarizer {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl Summarizer {
    /// 从环境变量 OPENAI_API_KEY 创建摘要器
    pub fn from_env() -> Result<Self, SummarizeError> {
        let api_key =
            std::env::var("OPENAI_API_KEY").map_err(|_| SummarizeError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    /// 使用给定的 API Key 创建摘要器
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }

    /// 调用 Chat Completions 接口
    fn chat(&self, system_prompt: &str, content: &str) -> Result<String, SummarizeError> {
        let body = json!({
            "model": MODEL_NAME,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": content },
            ],
        });

        let response: serde_json::Value = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or(SummarizeError::MalformedResponse)
    }

    /// 为单个小节生成摘要
    ///
    /// 超出 token 预算且允许拆分时，按行切块后逐块摘要再拼接；
    /// 请求失败时退化为占位文本而不向上传播
    pub fn generate_summary(&self, section: &Section, allow_splitting: bool) -> String {
        let section_text = section.to_string();

        let result = if estimate_tokens(&section_text) > MAX_TOKENS && allow_splitting {
            self.summarize_in_chunks(&section_text)
        } else {
            self.chat(SUMMARIZER_PROMPT, &section_text)
        };

        match result {
            Ok(summary) => summary,
            Err(e) => {
                log::warn!("小节摘要失败 {}: {}", section.name, e);
                FAILED_SUMMARY.to_string()
            }
        }
    }

    /// 将长文本按行缓冲切块，逐块摘要后以空格拼接
    fn summarize_in_chunks(&self, text: &str) -> Result<String, SummarizeError> {
        let mut summaries = Vec::new();
        for chunk in split_into_chunks(text, MAX_TOKENS) {
            summaries.push(self.chat(SUMMARIZER_PROMPT, &chunk)?);
        }
        Ok(summaries.join(" "))
    }

    /// 判断摘要内容是否有用
    ///
    /// 分类请求失败时按有用处理，避免误丢内容
    fn summary_is_useful(&self, summary: &str) -> bool {
        match self.chat(IMPORTANCE_CLASSIFIER_PROMPT, summary) {
            Ok(answer) => answer.to_lowercase() == "yes",
            Err(e) => {
                log::warn!("重要性分类失败: {}", e);
                true
            }
        }
    }
}

/// 对全部章节逐节生成摘要
///
/// # 参数
/// - `summarizer`: 摘要器
/// - `chapters`: 提取得到的章节列表
/// - `synthesize`: 是否在摘要后输出聚合统计
/// - `allow_splitting`: 超长小节是否允许拆分摘要
/// - `only_important`: 是否对摘要做重要性分类
///
/// # 返回
/// 每章的摘要结构：章标题 + 各小节的标题、摘要、错误与有用标记
pub fn summarize_chapters(
    summarizer: &Summarizer,
    chapters: &[Chapter],
    synthesize: bool,
    allow_splitting: bool,
    only_important: bool,
) -> Vec<ChapterSummary> {
    let mut chapter_summaries = Vec::new();
    let mut all_summary_words = 0;

    for chapter in chapters {
        log::info!("处理章节 {}: {} 个小节", chapter.name, chapter.sections.len());
        let mut section_summaries = Vec::new();

        for section in &chapter.sections {
            log::info!("处理小节 {}", section.name);
            let summary = summarizer.generate_summary(section, allow_splitting);
            let has_errors = summary_has_errors(&summary);
            let useful = if only_important {
                summarizer.summary_is_useful(&summary)
            } else {
                true
            };

            all_summary_words += summary.split_whitespace().count();
            section_summaries.push(SectionSummary {
                name: section.name.clone(),
                summary,
                has_errors,
                useful,
            });
        }

        chapter_summaries.push(ChapterSummary {
            name: chapter.name.clone(),
            sections: section_summaries,
        });
    }

    log::info!("摘要总词数: {}", all_summary_words);

    if synthesize {
        report_statistics(&chapter_summaries);
    }

    chapter_summaries
}

/// 词面检测摘要是否失败
///
/// 失败的摘要结果中会出现这些词
pub fn summary_has_errors(summary: &str) -> bool {
    let lower = summary.to_lowercase();
    lower.contains("sorry") || lower.contains("summarize")
}

/// 输出聚合统计：被忽略的小节数、全部与有用摘要的词数
fn report_statistics(chapters: &[ChapterSummary]) {
    let mut total_words = 0;
    let mut total_useful_words = 0;
    let mut ignored_sections = 0;

    for chapter in chapters {
        log::info!("# {}", chapter.name);
        for section in &chapter.sections {
            log::info!("## {}", section.name);
            if section.has_errors {
                ignored_sections += 1;
                continue;
            }

            let words = section.summary.split_whitespace().count();
            total_words += words;
            if section.useful {
                total_useful_words += words;
            }
        }
    }

    log::info!("忽略 {} 个小节", ignored_sections);
    log::info!("全部小节摘要总词数: {}", total_words);
    log::info!("有用小节摘要总词数: {}", total_useful_words);
}

/// 粗略估算文本的 token 数（按 4 字节/token 折算）
fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// 按行缓冲切块，使每块不超过 token 预算
///
/// 单行超出预算时独立成块，内容不丢失
fn split_into_chunks(text: &str, max_tokens: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in text.split('\n') {
        buffer.push(line);
        if estimate_tokens(&buffer.join("\n")) > max_tokens {
            buffer.pop();
            if !buffer.is_empty() {
                chunks.push(buffer.join("\n"));
            }
            buffer = vec![line];
        }
    }

    if !buffer.is_empty() {
        chunks.push(buffer.join("\n"));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_has_errors() {
        assert!(summary_has_errors("Sorry, I could not summarize this section."));
        assert!(summary_has_errors("I cannot summarize that text."));
        assert!(!summary_has_errors("The chapter describes the town in detail."));
    }

    #[test]
    fn test_failed_summary_is_detected() {
        // 占位文本必须能被词面检测识别为失败
        assert!(summary_has_errors(FAILED_SUMMARY));
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens(&"x".repeat(12000)), 3000);
    }

    #[test]
    fn test_split_into_chunks_short_text() {
        let chunks = split_into_chunks("one line\nanother line", MAX_TOKENS);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "one line\nanother line");
    }

    #[test]
    fn test_split_into_chunks_preserves_content() {
        // 三行，每行约 25 token，预算 40：切成多块且内容不丢
        let line = "x".repeat(100);
        let text = format!("{}\n{}\n{}", line, line, line);
        let chunks = split_into_chunks(&text, 40);

        assert!(chunks.len() > 1);
        let rejoined = chunks.join("\n");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn test_split_into_chunks_oversized_line() {
        // 单行超出预算时独立成块
        let huge = "y".repeat(400);
        let chunks = split_into_chunks(&huge, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], huge);
    }

    #[test]
    fn test_summarizer_from_env_requires_key() {
        // 测试进程内未设置变量时报 MissingApiKey
        std::env::remove_var("OPENAI_API_KEY");
        assert!(matches!(
            Summarizer::from_env(),
            Err(SummarizeError::MissingApiKey)
        ));
    }
}
