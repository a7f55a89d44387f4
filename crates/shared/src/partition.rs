//! Extraction of an "array of arrays of integers" from free-form model text.
//!
//! Grammar:
//!
//! ```text
//! partition := '[' ws ( group ( ws ',' ws group )* )? ws ']'
//! group     := '[' ws ( index ( ws ',' ws index )* )? ws ']'
//! index     := digit+
//! ws        := ( ' ' | '\t' | '\r' | '\n' )*
//! ```
//!
//! The first `[` (scanning left to right) at which the grammar matches wins.

/// Result of scanning a response for a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partition {
    Groups(Vec<Vec<usize>>),
    NoMatch,
}

pub fn parse_partition(text: &str) -> Partition {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'[' {
            continue;
        }
        let mut cursor = Cursor { bytes, pos: start };
        if let Some(groups) = cursor.partition() {
            return Partition::Groups(groups);
        }
    }
    Partition::NoMatch
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn partition(&mut self) -> Option<Vec<Vec<usize>>> {
        self.list(Self::group)
    }

    fn group(&mut self) -> Option<Vec<usize>> {
        self.list(Self::index)
    }

    /// `'[' ws ( item ( ws ',' ws item )* )? ws ']'`
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Option<T>) -> Option<Vec<T>> {
        if !self.eat(b'[') {
            return None;
        }
        self.skip_ws();

        let mut items = Vec::new();
        if self.eat(b']') {
            return Some(items);
        }

        loop {
            items.push(item(self)?);
            self.skip_ws();
            if self.eat(b']') {
                return Some(items);
            }
            if !self.eat(b',') {
                return None;
            }
            self.skip_ws();
        }
    }

    fn index(&mut self) -> Option<usize> {
        let start = self.pos;
        let mut value: usize = 0;
        while let Some(b @ b'0'..=b'9') = self.peek() {
            value = value
                .saturating_mul(10)
                .saturating_add(usize::from(b - b'0'));
            self.pos += 1;
        }
        (self.pos > start).then_some(value)
    }
}
