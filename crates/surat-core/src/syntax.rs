//! Placeholder syntax.
//!
//! Paragraph text is tokenized into literal text, brace tags (`{name}`,
//! `{#name}`, `{^name}`, `{/name}`) and bare placeholders (`t.word` outside
//! braces). Tokens carry byte spans into the paragraph text so the renderer
//! can rewrite exactly the characters a tag occupied.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SyntaxError;

/// Pattern of a placeholder tag: the reserved prefix followed by ASCII word
/// characters.
pub const TAG_PATTERN: &str = r"t\.[A-Za-z0-9_]+";

pub(crate) static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(TAG_PATTERN).expect("tag pattern is a valid regex")
});

const OPEN: char = '{';
const CLOSE: char = '}';
const FRAGMENT_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Text,
    Value(String),
    Open { name: String, inverted: bool },
    Close(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// A compiled paragraph-level construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    Text {
        start: usize,
        end: usize,
    },
    Value {
        name: String,
        start: usize,
        end: usize,
    },
    /// A section opened and closed inside this paragraph.
    Section {
        name: String,
        inverted: bool,
        start: usize,
        end: usize,
        body: Vec<Item>,
    },
    /// A section open whose close lies in a later paragraph.
    Open {
        name: String,
        inverted: bool,
        start: usize,
        end: usize,
    },
    /// A section close whose open lies in an earlier paragraph.
    Close {
        name: String,
        start: usize,
        end: usize,
    },
}

fn fragment(text: &str, at: usize) -> String {
    text[at..].chars().take(FRAGMENT_LEN).collect()
}

/// Split `text` into tokens.
pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut chars = text.char_indices();

    while let Some((at, c)) = chars.next() {
        match c {
            OPEN => {
                push_literal(text, literal_start, at, &mut tokens);
                let end = loop {
                    match chars.next() {
                        Some((close, CLOSE)) => break close + CLOSE.len_utf8(),
                        Some((_, OPEN)) | None => {
                            return Err(SyntaxError::UnclosedTag {
                                fragment: fragment(text, at),
                            });
                        }
                        Some(_) => {}
                    }
                };
                tokens.push(Token {
                    kind: tag_kind(&text[at + 1..end - 1])?,
                    start: at,
                    end,
                });
                literal_start = end;
            }
            CLOSE => {
                return Err(SyntaxError::UnopenedTag {
                    fragment: fragment(text, literal_start),
                });
            }
            _ => {}
        }
    }
    push_literal(text, literal_start, text.len(), &mut tokens);
    Ok(tokens)
}

fn tag_kind(inner: &str) -> Result<TokenKind, SyntaxError> {
    let inner = inner.trim();
    let (marker, name) = match inner.chars().next() {
        Some(m @ ('#' | '^' | '/')) => (Some(m), inner[1..].trim()),
        _ => (None, inner),
    };
    if name.is_empty() {
        return Err(SyntaxError::EmptyTag);
    }
    let name = name.to_owned();
    Ok(match marker {
        Some('#') => TokenKind::Open {
            name,
            inverted: false,
        },
        Some('^') => TokenKind::Open {
            name,
            inverted: true,
        },
        Some(_) => TokenKind::Close(name),
        None => TokenKind::Value(name),
    })
}

/// Push literal text, splitting out bare placeholders.
fn push_literal(text: &str, start: usize, end: usize, tokens: &mut Vec<Token>) {
    let mut cursor = start;
    for m in TAG_RE.find_iter(&text[start..end]) {
        let (m_start, m_end) = (start + m.start(), start + m.end());
        if m_start > cursor {
            tokens.push(Token {
                kind: TokenKind::Text,
                start: cursor,
                end: m_start,
            });
        }
        tokens.push(Token {
            kind: TokenKind::Value(m.as_str().to_owned()),
            start: m_start,
            end: m_end,
        });
        cursor = m_end;
    }
    if end > cursor {
        tokens.push(Token {
            kind: TokenKind::Text,
            start: cursor,
            end,
        });
    }
}

/// Compile a paragraph's text.
///
/// Sections closed inside the paragraph become [`Item::Section`]. Section
/// tags without a partner here are kept as [`Item::Open`] / [`Item::Close`]
/// markers for the part-level pass to pair up; all unpaired closes come
/// before all unpaired opens.
pub(crate) fn compile(text: &str) -> Result<Vec<Item>, SyntaxError> {
    let tokens = tokenize(text)?;
    let partners = pair_sections(&tokens)?;
    Ok(build(&tokens, &partners, 0, tokens.len()))
}

/// The index of each section tag's partner within the paragraph, if any.
fn pair_sections(tokens: &[Token]) -> Result<Vec<Option<usize>>, SyntaxError> {
    let mut partners = vec![None; tokens.len()];
    let mut pending: Vec<usize> = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        let TokenKind::Close(found) = &token.kind else {
            if matches!(token.kind, TokenKind::Open { .. }) {
                pending.push(index);
            }
            continue;
        };
        let Some(opener) = pending.pop() else {
            continue;
        };
        if let TokenKind::Open { name, .. } = &tokens[opener].kind {
            if name != found {
                return Err(SyntaxError::MismatchedSection {
                    expected: name.clone(),
                    found: found.clone(),
                });
            }
        }
        partners[opener] = Some(index);
        partners[index] = Some(opener);
    }
    Ok(partners)
}

fn build(tokens: &[Token], partners: &[Option<usize>], from: usize, to: usize) -> Vec<Item> {
    let mut items = Vec::new();
    let mut index = from;
    while index < to {
        let Token { kind, start, end } = &tokens[index];
        let (start, end) = (*start, *end);
        match (kind, partners[index]) {
            (TokenKind::Text, _) => items.push(Item::Text { start, end }),
            (TokenKind::Value(name), _) => items.push(Item::Value {
                name: name.clone(),
                start,
                end,
            }),
            (TokenKind::Open { name, inverted }, Some(close)) => {
                items.push(Item::Section {
                    name: name.clone(),
                    inverted: *inverted,
                    start,
                    end: tokens[close].end,
                    body: build(tokens, partners, index + 1, close),
                });
                index = close;
            }
            (TokenKind::Open { name, inverted }, None) => items.push(Item::Open {
                name: name.clone(),
                inverted: *inverted,
                start,
                end,
            }),
            // Paired closes are stepped over by their open.
            (TokenKind::Close(name), _) => items.push(Item::Close {
                name: name.clone(),
                start,
                end,
            }),
        }
        index += 1;
    }
    items
}

/// Whether the paragraph holds one unpaired section tag and nothing else but
/// whitespace.
pub(crate) fn is_lone_marker(items: &[Item], text: &str) -> bool {
    let mut significant = items.iter().filter(|item| match item {
        Item::Text { start, end } => !text[*start..*end].trim().is_empty(),
        _ => true,
    });
    matches!(
        (significant.next(), significant.next()),
        (Some(Item::Open { .. } | Item::Close { .. }), None)
    )
}
