//! Line-oriented card stream with one card of lookahead.

use crate::error::{CodecError, CodecResult};

pub const HEADER_KEY: &str = "HY8PROJECTFILE";

#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub key: String,
    pub value: String,
    /// 1-based source line.
    pub line: usize,
}

impl Card {
    fn parse(text: &str, line: usize) -> Self {
        if let Some(rest) = text.strip_prefix(HEADER_KEY) {
            return Card {
                key: HEADER_KEY.to_string(),
                value: rest.trim().to_string(),
                line,
            };
        }
        let (key, value) = match text.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (text, ""),
        };
        Card {
            key: key.to_string(),
            value: value.to_string(),
            line,
        }
    }
}

/// Cursor over raw lines plus a single push-back slot.
pub struct CardStream<'a> {
    lines: Vec<&'a str>,
    cursor: usize,
    pushed: Option<Card>,
}

impl<'a> CardStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            cursor: 0,
            pushed: None,
        }
    }

    /// Number of the last raw line consumed.
    pub fn line(&self) -> usize {
        self.cursor
    }

    pub fn next_card(&mut self) -> Option<Card> {
        if let Some(card) = self.pushed.take() {
            return Some(card);
        }
        while self.cursor < self.lines.len() {
            let raw = self.lines[self.cursor];
            self.cursor += 1;
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            return Some(Card::parse(text, self.cursor));
        }
        None
    }

    pub fn push_back(&mut self, card: Card) {
        debug_assert!(self.pushed.is_none(), "card stream holds one pushed card");
        self.pushed = Some(card);
    }

    /// Raw lines up to the terminator, matched as a case-insensitive prefix.
    /// Text following the terminator on its line comes back as a card keyed
    /// by the terminator.
    pub fn read_block(&mut self, terminator: &str) -> CodecResult<Vec<String>> {
        let target = terminator.to_ascii_uppercase();
        let start = self.cursor;
        let mut contents = Vec::new();
        while self.cursor < self.lines.len() {
            let raw = self.lines[self.cursor];
            self.cursor += 1;
            let text = raw.trim();
            let is_end = text
                .get(..target.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(&target));
            if is_end {
                let trailing = text[target.len()..].trim();
                if !trailing.is_empty() {
                    self.push_back(Card {
                        key: terminator.to_string(),
                        value: trailing.to_string(),
                        line: self.cursor,
                    });
                }
                return Ok(contents);
            }
            contents.push(raw.to_string());
        }
        Err(CodecError::format(
            start,
            format!("block is never closed by {terminator}"),
        ))
    }

    /// Discard raw lines through the first one equal to `target`
    /// (case-insensitive).
    pub fn skip_until(&mut self, target: &str) -> CodecResult<()> {
        let start = self.cursor;
        while self.cursor < self.lines.len() {
            let raw = self.lines[self.cursor];
            self.cursor += 1;
            if raw.trim().eq_ignore_ascii_case(target) {
                return Ok(());
            }
        }
        Err(CodecError::format(start, format!("missing '{target}'")))
    }
}
