//! Block streaming for channel message delivery.
//!
//! Splits long responses into message blocks and delivers them
//! with configurable pacing to simulate natural typing behavior.
//! This is particularly useful for messaging channels (Telegram, Slack)
//! where a single massive message is less readable than several shorter ones.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for block streaming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStreamConfig {
    /// Whether block streaming is enabled.
    pub enabled: bool,
    /// Maximum characters per block.
    pub max_block_chars: usize,
    /// Minimum characters to trigger splitting.
    pub min_split_threshold: usize,
    /// Delay between blocks in milliseconds.
    pub inter_block_delay_ms: u64,
    /// Whether to add typing indicators between blocks.
    pub show_typing: bool,
    /// Split on paragraph boundaries when possible.
    pub prefer_paragraph_breaks: bool,
    /// Maximum number of blocks per response.
    pub max_blocks: usize,
}

impl Default for BlockStreamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_block_chars: 2000,
            min_split_threshold: 3000,
            inter_block_delay_ms: 800,
            show_typing: true,
            prefer_paragraph_breaks: true,
            max_blocks: 10,
        }
    }
}

/// A block of text to be sent as a separate message.
#[derive(Debug, Clone)]
pub struct TextBlock {
    /// The text content of this block.
    pub content: String,
    /// Block index (0-based).
    pub index: usize,
    /// Total number of blocks.
    pub total: usize,
    /// Whether this is the final block.
    pub is_last: bool,
}

/// Split a response into blocks for streaming delivery.
///
/// Returns a single block if content length is below `min_split_threshold`.
/// Otherwise splits on paragraph boundaries, falling back to sentence
/// boundaries and then word boundaries when paragraphs are too long.
pub fn split_into_blocks(content: &str, config: &BlockStreamConfig) -> Vec<TextBlock> {
    if content.is_empty() {
        return vec![TextBlock {
            content: String::new(),
            index: 0,
            total: 1,
            is_last: true,
        }];
    }

    // Below threshold: return as a single block.
    if content.len() < config.min_split_threshold {
        return vec![TextBlock {
            content: content.to_string(),
            index: 0,
            total: 1,
            is_last: true,
        }];
    }

    let raw_chunks = if config.prefer_paragraph_breaks {
        split_by_paragraphs(content, config.max_block_chars)
    } else {
        split_by_sentences(content, config.max_block_chars)
    };

    // If splitting produced nothing (e.g., whitespace-only content),
    // return a single block with the trimmed content.
    if raw_chunks.is_empty() {
        return vec![TextBlock {
            content: content.trim().to_string(),
            index: 0,
            total: 1,
            is_last: true,
        }];
    }

    // Enforce max_blocks by merging overflow into the last block.
    let chunks = enforce_max_blocks(raw_chunks, config.max_blocks);

    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextBlock {
            content: text,
            index: i,
            total,
            is_last: i == total - 1,
        })
        .collect()
}

/// Calculate the delay before sending a block.
///
/// Uses a slight random jitter (plus or minus 20%) around the configured
/// inter-block delay for a more natural feel. The first block (index 0)
/// is sent immediately with no delay.
pub fn block_delay(config: &BlockStreamConfig, block_index: usize) -> Duration {
    if block_index == 0 {
        return Duration::ZERO;
    }

    let base_ms = config.inter_block_delay_ms as f64;
    let jitter_range = base_ms * 0.2;
    let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
    let delay_ms = (base_ms + jitter).max(0.0) as u64;

    Duration::from_millis(delay_ms)
}

/// Determine if a response should be block-streamed.
///
/// Returns `true` when streaming is enabled and the content length meets
/// or exceeds the minimum split threshold.
pub fn should_stream(content: &str, config: &BlockStreamConfig) -> bool {
    config.enabled && content.len() >= config.min_split_threshold
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Split text on paragraph boundaries (`\n\n`), falling back to sentence
/// or word splitting when individual paragraphs exceed `max_chars`.
fn split_by_paragraphs(content: &str, max_chars: usize) -> Vec<String> {
    let paragraphs = split_on_double_newline(content);
    let mut blocks: Vec<String> = Vec::new();
    let mut current_block = String::new();

    for para in paragraphs {
        // If a single paragraph is already too long, split it further.
        if para.len() > max_chars {
            // Flush whatever we have accumulated so far.
            if !current_block.is_empty() {
                blocks.push(current_block.trim_end().to_string());
                current_block = String::new();
            }
            let sub_chunks = split_by_sentences(&para, max_chars);
            blocks.extend(sub_chunks);
            continue;
        }

        // Check if appending this paragraph would exceed the limit.
        let separator = if current_block.is_empty() { "" } else { "\n\n" };
        let projected_len = current_block.len() + separator.len() + para.len();

        if projected_len > max_chars && !current_block.is_empty() {
            blocks.push(current_block.trim_end().to_string());
            current_block = para;
        } else {
            if !current_block.is_empty() {
                current_block.push_str("\n\n");
            }
            current_block.push_str(&para);
        }
    }

    if !current_block.is_empty() {
        blocks.push(current_block.trim_end().to_string());
    }

    blocks
}

/// Split raw text on `\n\n` boundaries (collapsing runs of 3+ newlines).
fn split_on_double_newline(content: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut consecutive_newlines = 0;

    for ch in content.chars() {
        if ch == '\n' {
            consecutive_newlines += 1;
        } else {
            if consecutive_newlines >= 2 {
                // We've hit a paragraph break.
                let trimmed = current.trim().to_string();
                if !trimmed.is_empty() {
                    result.push(trimmed);
                }
                current = String::new();
            } else {
                // Fewer than 2 newlines — keep them as-is.
                for _ in 0..consecutive_newlines {
                    current.push('\n');
                }
            }
            consecutive_newlines = 0;
            current.push(ch);
        }
    }

    // Flush remaining content.
    let trimmed = current.trim().to_string();
    if !trimmed.is_empty() {
        result.push(trimmed);
    }

    result
}

/// Split text on sentence boundaries (`. `, `! `, `? `), falling back to
/// word boundaries when sentences are too long.
fn split_by_sentences(content: &str, max_chars: usize) -> Vec<String> {
    let sentences = split_on_sentence_end(content);
    let mut blocks: Vec<String> = Vec::new();
    let mut current_block = String::new();

    for sentence in sentences {
        // If a single sentence exceeds max_chars, split by words.
        if sentence.len() > max_chars {
            if !current_block.is_empty() {
                blocks.push(current_block.trim_end().to_string());
                current_block = String::new();
            }
            let sub_chunks = split_by_words(&sentence, max_chars);
            blocks.extend(sub_chunks);
            continue;
        }

        let projected_len = current_block.len() + sentence.len();
        if projected_len > max_chars && !current_block.is_empty() {
            blocks.push(current_block.trim_end().to_string());
            current_block = sentence;
        } else {
            current_block.push_str(&sentence);
        }
    }

    if !current_block.is_empty() {
        blocks.push(current_block.trim_end().to_string());
    }

    blocks
}

/// Split text at sentence-ending punctuation followed by a space.
/// Each chunk retains its trailing punctuation and space.
fn split_on_sentence_end(content: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();

    let mut i = 0;
    while i < len {
        current.push(chars[i]);

        // Check for sentence boundary: punctuation followed by a space.
        if (chars[i] == '.' || chars[i] == '!' || chars[i] == '?')
            && i + 1 < len
            && chars[i + 1] == ' '
        {
            // Include the trailing space in this chunk.
            current.push(' ');
            i += 1; // skip the space
            result.push(current);
            current = String::new();
        }

        i += 1;
    }

    if !current.is_empty() {
        result.push(current);
    }

    result
}

/// Split text on word boundaries (spaces) as a last resort.
fn split_by_words(content: &str, max_chars: usize) -> Vec<String> {
    let mut blocks: Vec<String> = Vec::new();
    let mut current_block = String::new();

    for word in content.split_inclusive(' ') {
        let projected_len = current_block.len() + word.len();
        if projected_len > max_chars && !current_block.is_empty() {
            blocks.push(current_block.trim_end().to_string());
            current_block = word.to_string();
        } else {
            current_block.push_str(word);
        }
    }

    // If a single word exceeds max_chars we still emit it as one block.
    if !current_block.is_empty() {
        blocks.push(current_block.trim_end().to_string());
    }

    blocks
}

/// Merge overflow blocks beyond `max_blocks` into the last allowed block.
fn enforce_max_blocks(mut blocks: Vec<String>, max_blocks: usize) -> Vec<String> {
    if max_blocks == 0 || blocks.len() <= max_blocks {
        return blocks;
    }

    let overflow: Vec<String> = blocks.drain(max_blocks - 1..).collect();
    let merged = overflow.join("\n\n");
    blocks.push(merged);

    blocks
}
