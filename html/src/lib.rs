use std::io::Read;
use tracing::{span, trace, Level};

mod parsing;

/// A single `name=value` pair of a tag, in source order
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The name and attributes of a start or self-closing tag
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl Tag {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }

    /// Looks up the value of the first attribute called `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Looks up an attribute value by its position in the tag
    pub fn attribute_at(&self, index: usize) -> Option<&str> {
        self.attributes.get(index).map(|a| a.value.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Token {
    /// `<name attr=value>`
    StartTag(Tag),
    /// `</name>`
    EndTag(String),
    /// `<name attr=value/>`
    SelfClosingTag(Tag),
    Text(String),
    Comment(String),
    /// `<!DOCTYPE ...>` and other `<!...>` declarations
    Doctype(String),
}

impl Token {
    /// Checks if this is a start tag (not a self-closing one) called `name`
    pub fn is_start(&self, name: &str) -> bool {
        matches!(self, Token::StartTag(tag) if tag.name == name)
    }

    pub fn is_end(&self, name: &str) -> bool {
        matches!(self, Token::EndTag(tag) if tag == name)
    }

    /// Returns the tag of a start or self-closing tag token
    pub fn tag(&self) -> Option<&Tag> {
        match self {
            Token::StartTag(tag) | Token::SelfClosingTag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("unexpected end of input inside markup at byte {offset}")]
    UnexpectedEof { offset: usize },
    #[error("could not read markup: {0}")]
    Read(String),
}

/// Pull-based HTML tokenizer.
///
/// Yields tokens in document order and stops after the source is exhausted or
/// after the first [`TokenError`].
pub struct Tokenizer {
    source: String,
    position: usize,
    // End tag name that closes the raw text element we are inside of
    raw_text: Option<String>,
    read_error: Option<String>,
    finished: bool,
}

impl Tokenizer {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            position: 0,
            raw_text: None,
            read_error: None,
            finished: false,
        }
    }

    /// Drains `reader` and tokenizes its contents. Invalid UTF-8 is replaced.
    ///
    /// A read failure keeps whatever was read before it; the failure itself is
    /// yielded as a [`TokenError::Read`] once those bytes have been tokenized.
    pub fn from_reader(mut reader: impl Read) -> Self {
        let span = span!(Level::DEBUG, "Reading markup");
        let _enter = span.enter();
        let mut bytes = Vec::new();
        let read_error = reader.read_to_end(&mut bytes).err().map(|e| e.to_string());
        trace!(bytes = bytes.len(), "Read markup");
        let mut tokenizer = Self::new(String::from_utf8_lossy(&bytes));
        tokenizer.read_error = read_error;
        tokenizer
    }

    /// Byte offset of the next unread character
    pub fn offset(&self) -> usize {
        self.position
    }

    fn raw_text_token(&mut self, end_tag: &str) -> Option<Token> {
        let rest = &self.source[self.position..];
        let (remaining, text) = parsing::raw_text(rest, end_tag);
        self.position += rest.len() - remaining.len();
        if text.is_empty() {
            None
        } else {
            Some(Token::Text(text.to_string()))
        }
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Token, TokenError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(end_tag) = self.raw_text.take() {
            if let Some(token) = self.raw_text_token(&end_tag) {
                trace!(offset = self.position, ?token, "Raw text");
                return Some(Ok(token));
            }
        }
        let rest = &self.source[self.position..];
        if rest.is_empty() {
            self.finished = true;
            return self.read_error.take().map(|e| Err(TokenError::Read(e)));
        }
        match parsing::token(rest) {
            Ok((remaining, token)) => {
                self.position += rest.len() - remaining.len();
                if let Token::StartTag(tag) = &token {
                    if parsing::is_raw_text_element(&tag.name) {
                        self.raw_text = Some(tag.name.clone());
                    }
                }
                trace!(offset = self.position, ?token, "Token");
                Some(Ok(token))
            }
            Err(_) => {
                self.finished = true;
                Some(Err(TokenError::UnexpectedEof {
                    offset: self.position,
                }))
            }
        }
    }
}
