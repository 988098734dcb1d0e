use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{PipelineError, Result};

/// Structural role of an extracted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Cell,
    Paragraph,
}

/// One text block recovered from the converted report, in document order.
/// `status_token` carries the alt text of a traffic-light icon found inside
/// the block, when the rendition preserved one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    pub text: String,
    pub status_token: Option<String>,
}

struct Patterns {
    blocks: Regex,
    icon_alt: Regex,
    tags: Regex,
    spaces: Regex,
}

impl Patterns {
    fn get() -> &'static Patterns {
        static PATTERNS: OnceLock<Patterns> = OnceLock::new();
        PATTERNS.get_or_init(|| Patterns {
            blocks: Regex::new(
                r"(?is)<h([1-6])[^>]*>(.*?)</h[1-6]>|<tr[^>]*>(.*?)</tr>|<p[^>]*>(.*?)</p>",
            )
            .expect("static pattern"),
            icon_alt: Regex::new(r#"(?i)<img[^>]*\balt\s*=\s*["']([^"']*)["']"#)
                .expect("static pattern"),
            tags: Regex::new(r"(?s)<[^>]*>").expect("static pattern"),
            spaces: Regex::new(r"\s+").expect("static pattern"),
        })
    }

    fn strip(&self, fragment: &str) -> String {
        let text = self.tags.replace_all(fragment, " ");
        let text = text
            .replace("&nbsp;", " ")
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"");
        self.spaces.replace_all(&text, " ").trim().to_string()
    }
}

/// Reads a converted report file and yields its text blocks. Fails with
/// `UnreadableDocument` when the file cannot be read or contains no
/// recognizable blocks at all.
pub fn extract_blocks(path: &Path) -> Result<Vec<TextBlock>> {
    let html = fs::read_to_string(path).map_err(|e| PipelineError::UnreadableDocument {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let blocks = extract_from_str(&html);
    if blocks.is_empty() {
        return Err(PipelineError::UnreadableDocument {
            path: path.to_path_buf(),
            reason: "no text blocks found".to_string(),
        });
    }
    Ok(blocks)
}

/// Block extraction over an already-loaded rendition. Blocks with neither
/// text nor a status icon are dropped.
pub fn extract_from_str(html: &str) -> Vec<TextBlock> {
    let patterns = Patterns::get();
    let mut blocks = Vec::new();

    for caps in patterns.blocks.captures_iter(html) {
        let block = if let (Some(level), Some(body)) = (caps.get(1), caps.get(2)) {
            let level = level.as_str().parse::<u8>().unwrap_or(1);
            TextBlock {
                kind: BlockKind::Heading(level),
                text: patterns.strip(body.as_str()),
                status_token: None,
            }
        } else if let Some(body) = caps.get(3) {
            let token = patterns
                .icon_alt
                .captures(body.as_str())
                .map(|c| c[1].trim().to_string());
            TextBlock {
                kind: BlockKind::Cell,
                text: patterns.strip(body.as_str()),
                status_token: token,
            }
        } else if let Some(body) = caps.get(4) {
            TextBlock {
                kind: BlockKind::Paragraph,
                text: patterns.strip(body.as_str()),
                status_token: None,
            }
        } else {
            continue;
        };

        if !block.text.is_empty() || block.status_token.is_some() {
            blocks.push(block);
        }
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        <html><body>
        <h1>Service Summary</h1>
        <p>EarlyWatch Alert for A1C</p>
        <h2>Overall Rating</h2>
        <table class="sa-table">
          <tr><td><img src="x.gif" alt="yellow rating"></td><td>Overall</td></tr>
        </table>
        <h3>Hardware Capacity</h3>
        <table class="sa-table">
          <tr><td><img alt='green rating'/></td><td>CPU capacity ok</td></tr>
          <tr><td>no icon here</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn yields_headings_rows_and_paragraphs_in_order() {
        let blocks = extract_from_str(SAMPLE);
        let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Paragraph,
                BlockKind::Heading(2),
                BlockKind::Cell,
                BlockKind::Heading(3),
                BlockKind::Cell,
                BlockKind::Cell,
            ]
        );
        assert_eq!(blocks[0].text, "Service Summary");
        assert_eq!(blocks[1].text, "EarlyWatch Alert for A1C");
    }

    #[test]
    fn picks_up_icon_alt_tokens_per_row() {
        let blocks = extract_from_str(SAMPLE);
        assert_eq!(blocks[3].status_token.as_deref(), Some("yellow rating"));
        assert_eq!(blocks[3].text, "Overall");
        assert_eq!(blocks[5].status_token.as_deref(), Some("green rating"));
        assert_eq!(blocks[6].status_token, None);
    }

    #[test]
    fn strips_tags_and_entities() {
        let blocks = extract_from_str("<p><b>CPU</b>&nbsp;load &amp; memory</p>");
        assert_eq!(blocks[0].text, "CPU load & memory");
    }

    #[test]
    fn empty_input_yields_no_blocks() {
        assert!(extract_from_str("").is_empty());
        assert!(extract_from_str("plain text, no markup").is_empty());
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = extract_blocks(Path::new("/nonexistent/report.html")).unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableDocument { .. }));
    }
}
