//! WordprocessingML part model.
//!
//! A templated XML part (`word/document.xml`, headers, footers, notes) is kept
//! as a flat sequence of owned quick-xml events, with every `<w:p>` element
//! lifted into a [`Paragraph`]. A paragraph knows its visible text (the
//! concatenation of its `<w:t>` nodes) and where each piece of that text lives,
//! so the renderer can work on joined text and write the result back into the
//! original runs.

use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::ArchiveError;

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// One top-level item of a part: markup outside any paragraph, or a whole
/// paragraph.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Markup(Event<'static>),
    Paragraph(Paragraph),
}

/// A `<w:t>` text node inside a paragraph.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    /// Index of the enclosing `<w:t>` start event.
    open: usize,
    /// Index of the text event itself.
    event: usize,
    /// Byte range of this node within [`Paragraph::text`].
    start: usize,
    end: usize,
}

/// A `<w:p>` element, from its start tag to its end tag inclusive.
#[derive(Debug, Clone)]
pub(crate) struct Paragraph {
    events: Vec<Event<'static>>,
    slots: Vec<Slot>,
    text: String,
}

/// A parsed templated part.
#[derive(Debug, Clone)]
pub(crate) struct Part {
    name: String,
    nodes: Vec<Node>,
}

/// A span of paragraph text to be replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Replacement {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Paragraph {
    fn from_events(events: Vec<Event<'static>>) -> Result<Self, String> {
        let mut slots = Vec::new();
        let mut text = String::new();
        let mut open_text: Option<usize> = None;

        for (index, event) in events.iter().enumerate() {
            match event {
                Event::Start(e) if e.name().as_ref() == TEXT => open_text = Some(index),
                Event::End(e) if e.name().as_ref() == TEXT => open_text = None,
                Event::Text(t) => {
                    if let Some(open) = open_text {
                        let content = t.unescape().map_err(|e| e.to_string())?;
                        let start = text.len();
                        text.push_str(&content);
                        slots.push(Slot {
                            open,
                            event: index,
                            start,
                            end: text.len(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            events,
            slots,
            text,
        })
    }

    /// The visible text of the paragraph.
    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// The original events of the paragraph, unchanged.
    #[cfg(test)]
    pub(crate) fn events(&self) -> &[Event<'static>] {
        &self.events
    }

    /// Rewrite the paragraph with `replacements` applied to its text.
    ///
    /// Replacements must be sorted by `start` and must not overlap. Each
    /// replacement's text goes into the node that holds its first character;
    /// the rest of the replaced span is removed from whichever nodes hold it.
    /// Newlines in the new text become `<w:br/>` inside the same run.
    pub(crate) fn rewrite(&self, replacements: &[Replacement]) -> Vec<Event<'static>> {
        if replacements.is_empty() {
            return self.events.clone();
        }

        let mut new_text: HashMap<usize, String> = HashMap::new();
        let mut preserve: HashSet<usize> = HashSet::new();
        for slot in &self.slots {
            let rewritten = self.rewrite_slot(slot, replacements);
            if rewritten != self.text[slot.start..slot.end] {
                new_text.insert(slot.event, rewritten);
                preserve.insert(slot.open);
            }
        }

        let mut out = Vec::with_capacity(self.events.len());
        for (index, event) in self.events.iter().enumerate() {
            if preserve.contains(&index) {
                if let Event::Start(start) = event {
                    out.push(Event::Start(preserve_space(start)));
                    continue;
                }
            }
            match new_text.get(&index) {
                Some(text) => push_text_with_breaks(&mut out, text),
                None => out.push(event.clone()),
            }
        }
        out
    }

    fn rewrite_slot(&self, slot: &Slot, replacements: &[Replacement]) -> String {
        let mut out = String::new();
        let mut pos = slot.start;
        for r in replacements
            .iter()
            .filter(|r| r.start < slot.end && r.end > slot.start)
        {
            let cut = r.start.max(slot.start);
            if cut > pos {
                out.push_str(&self.text[pos..cut]);
            }
            if r.start >= slot.start {
                out.push_str(&r.text);
            }
            pos = r.end.min(slot.end);
        }
        if pos < slot.end {
            out.push_str(&self.text[pos..slot.end]);
        }
        out
    }
}

fn preserve_space(start: &BytesStart<'static>) -> BytesStart<'static> {
    let has_space = start
        .attributes()
        .flatten()
        .any(|a| a.key.as_ref() == b"xml:space");
    let mut start = start.clone();
    if !has_space {
        start.push_attribute(("xml:space", "preserve"));
    }
    start
}

fn push_text_with_breaks(out: &mut Vec<Event<'static>>, text: &str) {
    let mut lines = text.split('\n');
    if let Some(first) = lines.next() {
        out.push(Event::Text(
            BytesText::new(first.strip_suffix('\r').unwrap_or(first)).into_owned(),
        ));
    }
    for line in lines {
        let line = line.strip_suffix('\r').unwrap_or(line);
        out.push(Event::End(BytesEnd::new("w:t")));
        out.push(Event::Empty(BytesStart::new("w:br")));
        let mut open = BytesStart::new("w:t");
        open.push_attribute(("xml:space", "preserve"));
        out.push(Event::Start(open));
        out.push(Event::Text(BytesText::new(line).into_owned()));
    }
}

impl Part {
    /// Parse a part, lifting every outermost `<w:p>` into a [`Paragraph`].
    pub(crate) fn parse(name: &str, xml: &[u8]) -> Result<Self, ArchiveError> {
        let malformed = |reason: String| ArchiveError::MalformedXml {
            part: name.to_owned(),
            reason,
        };

        let mut reader = Reader::from_reader(xml);
        let mut nodes = Vec::new();
        let mut depth: usize = 0;
        let mut paragraph: Option<(usize, Vec<Event<'static>>)> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| malformed(format!("at byte {}: {e}", reader.buffer_position())))?
                .into_owned();

            match &event {
                Event::Eof => break,
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }

            let is_paragraph_start =
                matches!(&event, Event::Start(e) if e.name().as_ref() == PARAGRAPH);
            if let Some((open_depth, mut events)) = paragraph.take() {
                events.push(event);
                if depth < open_depth {
                    let paragraph = Paragraph::from_events(events).map_err(malformed)?;
                    nodes.push(Node::Paragraph(paragraph));
                } else {
                    paragraph = Some((open_depth, events));
                }
            } else if is_paragraph_start {
                paragraph = Some((depth, vec![event]));
            } else {
                nodes.push(Node::Markup(event));
            }
        }

        if depth != 0 || paragraph.is_some() {
            return Err(malformed("unexpected end of document".to_owned()));
        }

        Ok(Self {
            name: name.to_owned(),
            nodes,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All paragraph texts of the part, in document order.
    pub(crate) fn paragraph_texts(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Paragraph(p) => Some(p.text()),
            Node::Markup(_) => None,
        })
    }

    /// Serialize the part's events back to XML.
    #[cfg(test)]
    pub(crate) fn to_xml(&self) -> Result<Vec<u8>, String> {
        let events = self.nodes.iter().flat_map(|node| match node {
            Node::Markup(event) => std::slice::from_ref(event),
            Node::Paragraph(p) => p.events(),
        });
        write_events(events.cloned())
    }
}

/// Serialize a stream of events to XML bytes.
pub(crate) fn write_events(
    events: impl IntoIterator<Item = Event<'static>>,
) -> Result<Vec<u8>, String> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer.write_event(event).map_err(|e| e.to_string())?;
    }
    Ok(writer.into_inner())
}
