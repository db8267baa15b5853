//! SGF parsing with a single hand-written tokenizer that builds the record tree.
//!
//! Grammar handled here:
//!
//! ```text
//! GameTree = "(" Node+ GameTree* ")"
//! Node     = ";" Property*
//! Property = KEY ("[" value "]")+
//! ```
//!
//! Values are kept verbatim. A backslash only stops the next character from
//! closing the value; it is not removed.

use crate::error::FormatError;

/// One property of a node: a key and every value given for it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub values: Vec<String>,
}

/// A node of the record tree. The first child continues the main line.
#[derive(Debug, Default, PartialEq)]
pub struct RecordNode {
    properties: Vec<Property>,
    children: Vec<RecordNode>,
}

impl RecordNode {
    /// Properties in the order their keys first appeared.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values(key).first().map(String::as_str)
    }

    /// All values recorded for `key`, including repeated occurrences.
    pub fn values(&self, key: &str) -> &[String] {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn children(&self) -> &[RecordNode] {
        &self.children
    }

    /// This node followed by the first-child chain below it.
    pub fn main_line(&self) -> MainLine<'_> {
        MainLine { next: Some(self) }
    }

    fn push_values(&mut self, key: String, values: Vec<String>) {
        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(existing) => existing.values.extend(values),
            None => self.properties.push(Property { key, values }),
        }
    }
}

// Freed from a work list so long chains and deep nesting never recurse.
impl Drop for RecordNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Iterator over a node and its first descendants.
pub struct MainLine<'a> {
    next: Option<&'a RecordNode>,
}

impl<'a> Iterator for MainLine<'a> {
    type Item = &'a RecordNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.children.first();
        Some(node)
    }
}

/// Parse SGF text into its root node.
pub fn parse_sgf(text: &str) -> Result<RecordNode, FormatError> {
    let trimmed = text.trim();
    if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
        return Err(FormatError::MissingRootDelimiters);
    }

    let mut parser = Parser {
        text,
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_whitespace();
    let root = parser.game_tree()?;

    parser.skip_whitespace();
    if parser.pos < parser.bytes.len() {
        return Err(FormatError::TrailingContent { offset: parser.pos });
    }
    Ok(root)
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> FormatError {
        let ch = self.text[self.pos..].chars().next().unwrap_or('\0');
        FormatError::UnexpectedChar {
            ch,
            offset: self.pos,
        }
    }

    /// Parse a game tree starting at `(`. Nested trees are kept on an explicit
    /// stack, so neither nesting depth nor sequence length recurses.
    fn game_tree(&mut self) -> Result<RecordNode, FormatError> {
        if self.peek() != Some(b'(') {
            return Err(self.unexpected());
        }
        let mut current = OpenTree::new(self.pos);
        let mut parents: Vec<OpenTree> = Vec::new();
        self.pos += 1;

        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b';') if current.variations.is_empty() => {
                    current.sequence.push(self.node()?);
                }
                Some(b'(') => {
                    parents.push(std::mem::replace(&mut current, OpenTree::new(self.pos)));
                    self.pos += 1;
                }
                Some(b')') => {
                    self.pos += 1;
                    let tree = current.close()?;
                    match parents.pop() {
                        Some(parent) => {
                            current = parent;
                            current.variations.push(tree);
                        }
                        None => return Ok(tree),
                    }
                }
                Some(_) => return Err(self.unexpected()),
                None => return Err(FormatError::UnclosedGameTree { offset: current.open }),
            }
        }
    }

    /// Parse a node starting at `;`.
    fn node(&mut self) -> Result<RecordNode, FormatError> {
        self.pos += 1;
        let mut node = RecordNode::default();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b) if b.is_ascii_uppercase() => {
                    let (key, values) = self.property()?;
                    node.push_values(key, values);
                }
                _ => return Ok(node),
            }
        }
    }

    fn property(&mut self) -> Result<(String, Vec<String>), FormatError> {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_uppercase()) {
            self.pos += 1;
        }
        let key = self.text[start..self.pos].to_string();

        let mut values = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'[') {
                values.push(self.value(&key)?);
            } else {
                break;
            }
        }

        if values.is_empty() {
            return Err(FormatError::MissingValue { key, offset: start });
        }
        Ok((key, values))
    }

    fn value(&mut self, key: &str) -> Result<String, FormatError> {
        let open = self.pos;
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek() {
                None => {
                    return Err(FormatError::UnterminatedValue {
                        key: key.to_string(),
                        offset: open,
                    })
                }
                Some(b'\\') => self.pos += 2,
                Some(b']') => {
                    let value = self.text[start..self.pos].to_string();
                    self.pos += 1;
                    return Ok(value);
                }
                Some(_) => self.pos += 1,
            }
        }
    }
}

/// A game tree whose `(` has been read but not its `)`.
struct OpenTree {
    open: usize,
    sequence: Vec<RecordNode>,
    variations: Vec<RecordNode>,
}

impl OpenTree {
    fn new(open: usize) -> Self {
        Self {
            open,
            sequence: Vec::new(),
            variations: Vec::new(),
        }
    }

    /// Chain the sequence back to front; variations hang off its last node.
    fn close(self) -> Result<RecordNode, FormatError> {
        let mut nodes = self.sequence.into_iter().rev();
        let mut tail = nodes
            .next()
            .ok_or(FormatError::EmptyGameTree { offset: self.open })?;
        tail.children.extend(self.variations);
        for mut node in nodes {
            node.children.push(tail);
            tail = node;
        }
        Ok(tail)
    }
}
