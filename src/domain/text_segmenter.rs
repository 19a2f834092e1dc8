//! 文本分段器
//!
//! 将整篇文本切分为适合单次 TTS 合成的片段，保持段落/句子完整。
//! 纯函数实现，无 I/O，结果完全由输入决定

/// 默认最大片段字符数
pub const DEFAULT_MAX_CHARS: usize = 200;

/// 分段配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 单个片段的最大字符数（按 char 计数，不是字节）
    pub max_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// 检查是否为句末标点（中英文句号、叹号、问号、分号）
#[inline]
fn is_sentence_terminal(ch: char) -> bool {
    matches!(
        ch,
        '。' | '．' | '.' | '！' | '!' | '？' | '?' | '；' | ';'
    )
}

/// 检查段落是否只是分隔线/空白填充（如 "----" 或 "——"）
#[inline]
fn is_filler_paragraph(s: &str) -> bool {
    s.chars()
        .all(|c| matches!(c, '-' | '—' | '–' | '―' | ' ' | '\t'))
}

/// 按空行切分段落
///
/// 连续空行只产生一个段落边界；段内换行直接拼接（中文文本无需空格）；
/// 纯分隔线段落被丢弃
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs.retain(|p| !is_filler_paragraph(p));
    paragraphs
}

/// 在句末标点之后切分句子，标点保留在前一句末尾
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences: Vec<String> = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        current.push(ch);
        if is_sentence_terminal(ch) {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    // 无句末标点的尾部
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// 累积规则：缓冲非空且追加后超限时，先冲刷缓冲再开始新缓冲
///
/// 段落粒度与句子粒度共用同一条规则。单个部分本身超限时不再细分，
/// 会在下一次追加前被整体冲刷为一个超长片段
fn accumulate(
    part: String,
    max_chars: usize,
    buffer: &mut String,
    buffer_chars: &mut usize,
    segments: &mut Vec<String>,
) {
    let part_chars = part.chars().count();
    if !buffer.is_empty() && *buffer_chars + part_chars > max_chars {
        segments.push(std::mem::take(buffer));
        *buffer_chars = 0;
    }
    buffer.push_str(&part);
    *buffer_chars += part_chars;
}

/// 对文本进行分段
///
/// 分段策略：
/// 1. 按空行切分段落，丢弃空段落与纯分隔线段落
/// 2. 短段落（≤ max_chars）直接参与累积合并
/// 3. 长段落先冲刷缓冲，再按句子粒度累积合并
/// 4. 处理完毕后冲刷剩余缓冲
///
/// 产出片段严格保持输入顺序；除"单句本身超长"外，每个片段不超过 max_chars
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for para in split_paragraphs(text) {
        let para_chars = para.chars().count();

        if para_chars <= config.max_chars {
            accumulate(
                para,
                config.max_chars,
                &mut buffer,
                &mut buffer_chars,
                &mut segments,
            );
        } else {
            // 长段落：先冲刷已有缓冲，再按句子粒度累积
            if !buffer.is_empty() {
                segments.push(std::mem::take(&mut buffer));
                buffer_chars = 0;
            }
            for sentence in split_sentences(&para) {
                accumulate(
                    sentence,
                    config.max_chars,
                    &mut buffer,
                    &mut buffer_chars,
                    &mut segments,
                );
            }
        }
    }

    if !buffer.is_empty() {
        segments.push(buffer);
    }

    segments
}

/// 使用默认配置分段（便捷方法）
pub fn segment_text_default(text: &str) -> Vec<String> {
    segment_text(text, &SegmentConfig::default())
}
