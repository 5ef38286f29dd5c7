use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::{Block, BlockKind};
use crate::inline::parse_inline;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").expect("invalid heading regex"));

/// Parse markdown text into a list of blocks, one per line.
///
/// Never fails: any input, the empty string included, yields at least one
/// block. Blank lines become [`BlockKind::Blank`] except a trailing one.
pub fn parse(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let last = lines.len() - 1;

    let mut blocks = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if let Some(block) = parse_heading(line) {
            blocks.push(block);
        } else if !line.trim().is_empty() || i == 0 {
            blocks.push(Block {
                kind: BlockKind::Paragraph,
                segments: parse_inline(line),
            });
        } else if i < last {
            blocks.push(Block::blank());
        }
    }
    blocks
}

fn parse_heading(line: &str) -> Option<Block> {
    let caps = HEADING.captures(line)?;
    let level = caps.get(1)?.as_str().len() as u8;
    let text = caps.get(2)?.as_str().trim();
    Some(Block {
        kind: BlockKind::Heading(level),
        segments: parse_inline(text),
    })
}
