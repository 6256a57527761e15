//! Text extraction collaborators.
//!
//! The pipeline consumes raw extracted text. Format-specific extractors
//! (PDF, audio, video captions) live outside this workspace and plug in
//! through [`TextExtractor`]; only text-based formats are handled here.

use docagent_core::{Error, Result};
use scraper::{Html, Node, Selector};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File types recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    PlainText,
    Markdown,
    Json,
    Html,
    Pdf,
    Audio,
    Video,
    Unknown,
}

impl FileType {
    /// Detect file type from extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" | "text" | "rst" | "srt" | "vtt" => Self::PlainText,
            "md" | "mdx" | "markdown" => Self::Markdown,
            "json" => Self::Json,
            "html" | "htm" => Self::Html,
            "pdf" => Self::Pdf,
            "mp3" | "wav" | "m4a" | "flac" | "ogg" => Self::Audio,
            "mp4" | "mov" | "mkv" | "avi" | "webm" => Self::Video,
            _ => Self::Unknown,
        }
    }

    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            Self::PlainText | Self::Markdown | Self::Json | Self::Html
        )
    }
}

/// Descriptive metadata reported by an extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub pages: Option<usize>,
    /// Size of the source in bytes.
    pub size: usize,
}

/// Extracted text plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub text: String,
    pub metadata: DocumentMetadata,
}

/// Produces raw text from an uploaded document.
pub trait TextExtractor: Send + Sync {
    /// Extract text from `bytes`. Fails with [`Error::Extraction`] when the
    /// format is unsupported or no text could be recovered.
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedDocument>;

    /// Convenience wrapper reading the file from disk.
    fn extract_path(&self, path: &Path) -> Result<ExtractedDocument> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.extract(&bytes, name)
    }
}

/// Extractor for text-based formats (plain text, Markdown, JSON, HTML).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8], filename: &str) -> Result<ExtractedDocument> {
        let file_type = FileType::from_filename(filename);
        if !file_type.is_text() && file_type != FileType::Unknown {
            return Err(Error::Extraction(format!(
                "unsupported file type for {}: {:?}",
                filename, file_type
            )));
        }

        let raw = String::from_utf8_lossy(bytes);
        let control = raw
            .chars()
            .filter(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
            .count();
        if control > raw.len() / 10 || (file_type == FileType::Unknown && raw.contains('\u{FFFD}')) {
            return Err(Error::Extraction(format!("{} looks like binary data", filename)));
        }

        let (text, title) = match file_type {
            FileType::Markdown => {
                let title = raw
                    .lines()
                    .find_map(|l| l.strip_prefix("# "))
                    .map(|t| t.trim().to_string());
                (strip_markdown(&raw), title)
            }
            FileType::Html => {
                let doc = Html::parse_document(&raw);
                (html_text(&doc), html_title(&doc))
            }
            _ => (raw.to_string(), None),
        };

        if text.trim().is_empty() {
            return Err(Error::Extraction(format!("no text found in {}", filename)));
        }

        tracing::debug!("Extracted {} chars from {}", text.len(), filename);
        Ok(ExtractedDocument {
            text,
            metadata: DocumentMetadata {
                title: title.or_else(|| {
                    Path::new(filename)
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                }),
                author: None,
                pages: None,
                size: bytes.len(),
            },
        })
    }
}

/// Drop Markdown heading markers, emphasis and code fences.
fn strip_markdown(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .map(|l| {
            let l = l.trim_start_matches('#').trim_start();
            let l = l.strip_prefix("- ").or_else(|| l.strip_prefix("* ")).unwrap_or(l);
            l.replace("**", "").replace('`', "")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Elements whose text is never part of the document body.
const HIDDEN_ELEMENTS: &[&str] = &["head", "title", "script", "style", "noscript", "template"];

/// Elements that start a new line of text.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "article", "header", "footer", "blockquote", "pre", "ul", "ol", "table",
];

fn html_title(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = doc.select(&selector).next()?.text().collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    (!title.is_empty()).then_some(title)
}

/// Visible text of a parsed page, one line per block element. Entities are
/// decoded once by the parser.
fn html_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        match node.value() {
            Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name()) => out.push('\n'),
            Node::Text(text) => {
                let hidden = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                });
                if !hidden {
                    out.push_str(text);
                }
            }
            _ => {}
        }
    }
    out.lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let doc = PlainTextExtractor.extract(b"Hello there.", "notes.txt").unwrap();
        assert_eq!(doc.text, "Hello there.");
        assert_eq!(doc.metadata.size, 12);
        assert_eq!(doc.metadata.title.as_deref(), Some("notes"));
    }

    #[test]
    fn test_markdown_title_and_stripping() {
        let md = b"# Cell Biology\n\nCells are **small**.\n```\ncode\n```\n- item one";
        let doc = PlainTextExtractor.extract(md, "bio.md").unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Cell Biology"));
        assert!(doc.text.contains("Cells are small."));
        assert!(!doc.text.contains("```"));
        assert!(doc.text.contains("item one"));
    }

    #[test]
    fn test_html() {
        let html = b"<html><head><title>Doc</title><style>p{}</style></head><body><p>Body &amp; soul.</p></body></html>";
        let doc = PlainTextExtractor.extract(html, "page.html").unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Doc"));
        assert!(doc.text.contains("Body & soul."));
        assert!(!doc.text.contains("p{}"));
    }

    #[test]
    fn test_html_uppercase_script_is_dropped() {
        let html = b"<HTML><BODY><SCRIPT>var x=1;</SCRIPT><p>Glaciers retreat every summer.</p></BODY></HTML>";
        let doc = PlainTextExtractor.extract(html, "ice.html").unwrap();
        assert!(doc.text.contains("Glaciers retreat every summer."));
        assert!(!doc.text.contains("var x"));
        assert_eq!(doc.metadata.title.as_deref(), Some("ice"));
    }

    #[test]
    fn test_html_entities_decoded_once() {
        let html = b"<p>Write &amp;lt;tag&amp;gt; literally.</p><p>Second&nbsp;block.</p>";
        let doc = PlainTextExtractor.extract(html, "escape.htm").unwrap();
        assert!(doc.text.contains("Write &lt;tag&gt; literally."));
        assert!(doc.text.contains("Second block."));
        assert!(!doc.text.contains("<tag>"));
    }

    #[test]
    fn test_unsupported_and_empty() {
        assert!(matches!(
            PlainTextExtractor.extract(b"%PDF-1.4", "paper.pdf"),
            Err(Error::Extraction(_))
        ));
        assert!(matches!(
            PlainTextExtractor.extract(b"   \n", "blank.txt"),
            Err(Error::Extraction(_))
        ));
    }

    #[test]
    fn test_extract_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.txt");
        std::fs::write(&path, "Lecture notes.").unwrap();
        let doc = PlainTextExtractor.extract_path(&path).unwrap();
        assert_eq!(doc.text, "Lecture notes.");
    }
}
