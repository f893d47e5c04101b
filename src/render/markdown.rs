//! Markdown → layout blocks.
//!
//! Inline styling is flattened; the PDF layer only needs block structure.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// A block of the plan document, in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    ListItem {
        depth: usize,
        marker: String,
        text: String,
    },
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Code(String),
    Rule,
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[derive(Default)]
struct TableBuilder {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Block>,
    text: String,
    heading: Option<u8>,
    /// Next ordinal per open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    table: Option<TableBuilder>,
    in_code: bool,
}

impl BlockCollector {
    fn take_text(&mut self) -> String {
        let text = std::mem::take(&mut self.text);
        text.trim().to_string()
    }

    fn flush_paragraph(&mut self) {
        let text = self.take_text();
        if !text.is_empty() {
            self.blocks.push(Block::Paragraph(text));
        }
    }

    fn flush_item(&mut self) {
        let text = self.take_text();
        if text.is_empty() {
            return;
        }
        let depth = self.lists.len().saturating_sub(1);
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = format!("{n}.");
                *n += 1;
                marker
            }
            _ => "-".to_string(),
        };
        self.blocks.push(Block::ListItem {
            depth,
            marker,
            text,
        });
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_paragraph();
                self.heading = Some(heading_level_to_u8(level));
            }
            Tag::List(start) => {
                // A nested list begins inside its parent item's text.
                if self.lists.is_empty() {
                    self.flush_paragraph();
                } else {
                    self.flush_item();
                }
                self.lists.push(start);
            }
            Tag::Item => self.text.clear(),
            Tag::Table(_) => {
                self.flush_paragraph();
                self.table = Some(TableBuilder::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.text.clear(),
            Tag::CodeBlock(_) => {
                self.flush_paragraph();
                self.in_code = true;
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                let text = self.take_text();
                let level = self.heading.take().unwrap_or(1);
                if !text.is_empty() {
                    self.blocks.push(Block::Heading { level, text });
                }
            }
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.flush_paragraph();
                } else {
                    self.text.push(' ');
                }
            }
            TagEnd::Item => self.flush_item(),
            TagEnd::List(_) => {
                self.lists.pop();
            }
            TagEnd::TableCell => {
                let cell = self.take_text();
                if let Some(table) = self.table.as_mut() {
                    table.row.push(cell);
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.blocks.push(Block::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::CodeBlock => {
                self.in_code = false;
                let code = std::mem::take(&mut self.text);
                let code = code.trim_end().to_string();
                if !code.is_empty() {
                    self.blocks.push(Block::Code(code));
                }
            }
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Code(text) => self.text.push_str(&text),
            Event::SoftBreak => self.text.push(if self.in_code { '\n' } else { ' ' }),
            Event::HardBreak => self.text.push('\n'),
            Event::InlineHtml(html) if html.to_ascii_lowercase().starts_with("<br") => {
                self.text.push(' ');
            }
            Event::TaskListMarker(checked) => {
                self.text.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::Rule => {
                self.flush_paragraph();
                self.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }
}

/// Parse markdown into layout blocks.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut collector = BlockCollector::default();
    for event in Parser::new_ext(markdown, options) {
        collector.event(event);
    }
    collector.flush_paragraph();
    collector.blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_and_paragraphs() {
        let blocks = parse_blocks("# Weekly Plan\n\nA calm week for **Maya**.\n\n## Monday");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Weekly Plan".to_string()
                },
                Block::Paragraph("A calm week for Maya.".to_string()),
                Block::Heading {
                    level: 2,
                    text: "Monday".to_string()
                },
            ]
        );
    }

    #[test]
    fn table_with_header_and_rows() {
        let md = "\
| Day | Morning | Afternoon | Evening | Night |
|-----|---------|-----------|---------|-------|
| **Monday** | Visual schedule | Park walk | Drawing | Bath |
| Tuesday | Music | Library | Puzzles | Story |
";
        let blocks = parse_blocks(md);
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::Table { header, rows } => {
                assert_eq!(header, &["Day", "Morning", "Afternoon", "Evening", "Night"]);
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0][0], "Monday");
                assert_eq!(rows[1][4], "Story");
            }
            other => panic!("expected table, got {other:?}"),
        }
    }

    #[test]
    fn bullet_and_ordered_lists() {
        let blocks = parse_blocks("- quiet corner\n- headphones\n\n1. first\n2. second\n");
        assert_eq!(
            blocks,
            vec![
                Block::ListItem {
                    depth: 0,
                    marker: "-".to_string(),
                    text: "quiet corner".to_string()
                },
                Block::ListItem {
                    depth: 0,
                    marker: "-".to_string(),
                    text: "headphones".to_string()
                },
                Block::ListItem {
                    depth: 0,
                    marker: "1.".to_string(),
                    text: "first".to_string()
                },
                Block::ListItem {
                    depth: 0,
                    marker: "2.".to_string(),
                    text: "second".to_string()
                },
            ]
        );
    }

    #[test]
    fn nested_list_keeps_parent_text() {
        let blocks = parse_blocks("- Morning\n  - brush teeth\n- Evening\n");
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::ListItem { depth: 0, text, .. } if text == "Morning"));
        assert!(
            matches!(&blocks[1], Block::ListItem { depth: 1, text, .. } if text == "brush teeth")
        );
        assert!(matches!(&blocks[2], Block::ListItem { depth: 0, text, .. } if text == "Evening"));
    }

    #[test]
    fn rule_and_code() {
        let blocks = parse_blocks("before\n\n---\n\n```\nline 1\nline 2\n```\n");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph("before".to_string()),
                Block::Rule,
                Block::Code("line 1\nline 2".to_string()),
            ]
        );
    }

    #[test]
    fn plain_text_is_one_paragraph() {
        let blocks = parse_blocks("Just some text\nacross lines");
        assert_eq!(
            blocks,
            vec![Block::Paragraph("Just some text across lines".to_string())]
        );
    }
}
