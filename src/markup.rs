//! Lightweight markup used by the profile page.
//!
//! Only three constructs are recognised: `## ` / `### ` headings, blank-line
//! paragraph breaks and `[text](url)` links. Everything else is plain text.

use std::sync::LazyLock;

use regex::Regex;

static LINK_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
  Text(String),
  Link { text: String, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
  Heading2(String),
  Heading3(String),
  /// One paragraph; each inner `Vec` is a source line.
  Paragraph(Vec<Vec<Inline>>),
}

/// Split a line into text and link spans.
pub fn parse_inline(line: &str) -> Vec<Inline> {
  let mut spans = Vec::new();
  let mut last = 0;
  for caps in LINK_RE.captures_iter(line) {
    let (Some(whole), Some(text), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else { continue };
    if whole.start() > last {
      spans.push(Inline::Text(line[last..whole.start()].to_string()));
    }
    spans.push(Inline::Link { text: text.as_str().to_string(), url: url.as_str().to_string() });
    last = whole.end();
  }
  if last < line.len() {
    spans.push(Inline::Text(line[last..].to_string()));
  }
  spans
}

/// Transform profile text into display blocks.
pub fn render_profile(text: &str) -> Vec<Block> {
  let mut blocks = Vec::new();
  let mut paragraph: Vec<Vec<Inline>> = Vec::new();

  let flush = |paragraph: &mut Vec<Vec<Inline>>, blocks: &mut Vec<Block>| {
    if !paragraph.is_empty() {
      blocks.push(Block::Paragraph(std::mem::take(paragraph)));
    }
  };

  for raw in text.lines() {
    let line = raw.trim_end();
    if let Some(h) = line.strip_prefix("### ") {
      flush(&mut paragraph, &mut blocks);
      blocks.push(Block::Heading3(h.trim().to_string()));
    } else if let Some(h) = line.strip_prefix("## ") {
      flush(&mut paragraph, &mut blocks);
      blocks.push(Block::Heading2(h.trim().to_string()));
    } else if line.trim().is_empty() {
      flush(&mut paragraph, &mut blocks);
    } else {
      paragraph.push(parse_inline(line));
    }
  }
  flush(&mut paragraph, &mut blocks);
  blocks
}
