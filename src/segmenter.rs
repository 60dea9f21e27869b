use async_trait::async_trait;
use std::str::FromStr;
use std::time::Duration;

// Headroom between the two is for the part label.
pub const DEFAULT_HARD_LIMIT: usize = 4096;
pub const DEFAULT_THRESHOLD: usize = 4000;
pub const DEFAULT_SECTION_DELIMITER: &str = "\n\n";
pub const DEFAULT_SUBSECTION_DELIMITER: &str = "\n- ";
pub const DEFAULT_PACING: Duration = Duration::from_secs(5);

/// Handling for a piece still above the threshold after every delimiter split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OversizePolicy {
    #[default]
    PassThrough,
    HardSplit,
}

impl FromStr for OversizePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passthrough" | "pass-through" => Ok(OversizePolicy::PassThrough),
            "split" | "hardsplit" | "hard-split" => Ok(OversizePolicy::HardSplit),
            other => Err(format!(
                "unknown oversize policy '{}': expected passthrough or split",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub hard_limit: usize,
    pub threshold: usize,
    pub section_delimiter: String,
    pub subsection_delimiter: String,
    pub oversize: OversizePolicy,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            hard_limit: DEFAULT_HARD_LIMIT,
            threshold: DEFAULT_THRESHOLD,
            section_delimiter: DEFAULT_SECTION_DELIMITER.to_string(),
            subsection_delimiter: DEFAULT_SUBSECTION_DELIMITER.to_string(),
            oversize: OversizePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// 1-based position.
    pub index: usize,
    pub total: usize,
    pub content: String,
}

impl Segment {
    pub fn label(&self) -> Option<String> {
        (self.total > 1).then(|| format!("[Part {}/{}]", self.index, self.total))
    }

    pub fn render(&self) -> String {
        match self.label() {
            Some(label) => format!("{}\n{}", label, self.content),
            None => self.content.clone(),
        }
    }
}

/// Length as counted by the delivery channel (UTF-16 code units).
pub fn text_len(text: &str) -> usize {
    text.encode_utf16().count()
}

#[derive(Debug, Clone, Default)]
pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        if config.threshold > config.hard_limit {
            log::warn!(
                "segment threshold {} is above the hard limit {}",
                config.threshold,
                config.hard_limit
            );
        }
        Self { config }
    }

    pub fn split(&self, text: &str) -> Vec<Segment> {
        let pieces = if text_len(text) <= self.config.threshold {
            vec![text.to_string()]
        } else {
            let mut pieces = Vec::new();
            let delimiter = self.config.section_delimiter.as_str();
            self.pack(
                text.split(delimiter),
                delimiter,
                Some(self.config.subsection_delimiter.as_str()),
                &mut pieces,
            );
            pieces
        };

        let total = pieces.len();
        let segments: Vec<Segment> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| Segment {
                index: i + 1,
                total,
                content,
            })
            .collect();

        for segment in &segments {
            let length = text_len(&segment.render());
            if length > self.config.hard_limit {
                log::warn!(
                    "part {}/{} is {} characters, above the {} limit",
                    segment.index,
                    segment.total,
                    length,
                    self.config.hard_limit
                );
            }
        }

        segments
    }

    fn pack<'a>(
        &self,
        parts: impl Iterator<Item = &'a str>,
        delimiter: &str,
        nested: Option<&str>,
        out: &mut Vec<String>,
    ) {
        let threshold = self.config.threshold;
        let delimiter_len = text_len(delimiter);
        let mut buffer: Option<(String, usize)> = None;

        for part in parts {
            let part_len = text_len(part);

            if let Some((text, len)) = buffer.as_mut() {
                if *len + delimiter_len + part_len <= threshold {
                    text.push_str(delimiter);
                    text.push_str(part);
                    *len += delimiter_len + part_len;
                    continue;
                }
            }
            flush(&mut buffer, out);

            if part_len <= threshold {
                buffer = Some((part.to_string(), part_len));
                continue;
            }

            match nested {
                Some(sub) => self.pack(part.split(sub), sub, None, out),
                None => self.emit_oversized(part, out),
            }
        }

        flush(&mut buffer, out);
    }

    fn emit_oversized(&self, part: &str, out: &mut Vec<String>) {
        match self.config.oversize {
            OversizePolicy::PassThrough => out.push(part.to_string()),
            OversizePolicy::HardSplit => {
                let mut rest = part;
                while text_len(rest) > self.config.threshold {
                    let cut = cut_point(rest, self.config.threshold);
                    out.push(rest[..cut].to_string());
                    rest = &rest[cut..];
                }
                if !rest.is_empty() {
                    out.push(rest.to_string());
                }
            }
        }
    }
}

fn flush(buffer: &mut Option<(String, usize)>, out: &mut Vec<String>) {
    if let Some((text, _)) = buffer.take() {
        if !text.is_empty() {
            out.push(text);
        }
    }
}

fn cut_point(text: &str, limit: usize) -> usize {
    let mut units = 0;
    let mut end = text.len();
    for (i, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > limit {
            end = i;
            break;
        }
    }
    if end == 0 {
        // A single character wider than the limit; take it anyway.
        return text.chars().next().map(char::len_utf8).unwrap_or(text.len());
    }

    let window = &text[..end];
    match window.rfind('\n').or_else(|| window.rfind(' ')) {
        Some(i) if i > 0 => i + 1,
        _ => end,
    }
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn send(&self, text: &str) -> Result<(), Self::Error>;
}

#[derive(Debug, thiserror::Error)]
#[error("Delivery of part {part}/{total} failed")]
pub struct DeliveryError<E: std::error::Error + 'static> {
    pub part: usize,
    pub total: usize,
    #[source]
    pub source: E,
}

pub async fn deliver<S>(
    sink: &S,
    segments: &[Segment],
    pacing: Duration,
) -> Result<(), DeliveryError<S::Error>>
where
    S: MessageSink + ?Sized,
{
    for (position, segment) in segments.iter().enumerate() {
        if position > 0 && !pacing.is_zero() {
            tokio::time::sleep(pacing).await;
        }
        log::info!("sending part {}/{}", segment.index, segment.total);
        sink.send(&segment.render())
            .await
            .map_err(|source| DeliveryError {
                part: segment.index,
                total: segment.total,
                source,
            })?;
    }
    Ok(())
}
