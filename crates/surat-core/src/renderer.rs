//! Template renderer.
//!
//! Renders every templated part of a [`Package`] against a [`Mapping`] and
//! returns a new package. Two modes are always on:
//!
//! - **paragraph loops**: a section whose open and close tags sit in
//!   different paragraphs repeats the smallest run of XML siblings that holds
//!   both tags. Tag paragraphs holding nothing but the tag disappear from the
//!   output. When the two tags sit in different cells of one table row, the
//!   row repeats;
//! - **linebreaks**: newlines in substituted values become `<w:br/>`.
//!
//! Sections opened and closed inside one paragraph render inline as text.
//! Missing values render as empty text. Any syntax error aborts the whole
//! render; the source package is never touched.

use quick_xml::events::{BytesStart, Event};
use serde_json::Value;

use crate::Mapping;
use crate::error::{ArchiveError, RenderError, SyntaxError};
use crate::package::Package;
use crate::part::{Node, Paragraph, Part, Replacement, write_events};
use crate::syntax::{Item, compile, is_lone_marker};

/// One level of variable lookup.
#[derive(Debug, Clone, Copy)]
struct Scope<'a> {
    frame: Frame<'a>,
    parent: Option<&'a Scope<'a>>,
}

#[derive(Debug, Clone, Copy)]
enum Frame<'a> {
    Root(&'a Mapping),
    Item(&'a Value),
}

impl<'a> Scope<'a> {
    fn root(mapping: &'a Mapping) -> Self {
        Self {
            frame: Frame::Root(mapping),
            parent: None,
        }
    }

    fn child(&'a self, value: &'a Value) -> Self {
        Self {
            frame: Frame::Item(value),
            parent: Some(self),
        }
    }

    /// Look `name` up from the innermost scope outwards. `.` is the current
    /// loop element.
    fn lookup(&self, name: &str) -> Option<&'a Value> {
        let found = match self.frame {
            Frame::Item(value) if name == "." => Some(value),
            Frame::Item(Value::Object(map)) | Frame::Root(map) => map.get(name),
            Frame::Item(_) => None,
        };
        found.or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

/// The scope values a section body is rendered with, one per repetition.
fn iterations<'a>(value: Option<&'a Value>, inverted: bool) -> Vec<Option<&'a Value>> {
    if inverted {
        return if is_truthy(value) { Vec::new() } else { vec![None] };
    }
    match value {
        Some(Value::Array(items)) => items.iter().map(Some).collect(),
        v if is_truthy(v) => vec![v],
        _ => Vec::new(),
    }
}

/// Text a value substitutes as.
fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn render_inline(items: &[Item], text: &str, scope: &Scope<'_>, out: &mut String) {
    for item in items {
        match item {
            Item::Text { start, end } => out.push_str(&text[*start..*end]),
            Item::Value { name, .. } => out.push_str(&display(scope.lookup(name))),
            Item::Section {
                name,
                inverted,
                body,
                ..
            } => {
                for value in iterations(scope.lookup(name), *inverted) {
                    match value {
                        Some(value) => render_inline(body, text, &scope.child(value), out),
                        None => render_inline(body, text, scope, out),
                    }
                }
            }
            Item::Open { .. } | Item::Close { .. } => {}
        }
    }
}

/// Elements that must keep at least one paragraph.
const PARAGRAPH_CONTAINERS: &[&[u8]] = &[
    b"w:tc",
    b"w:hdr",
    b"w:ftr",
    b"w:footnote",
    b"w:endnote",
    b"w:txbxContent",
];

/// A part's nodes as an element tree, with cross-paragraph sections lifted
/// into [`Tree::Section`].
enum Tree<'p> {
    Leaf(&'p Event<'static>),
    Paragraph {
        paragraph: &'p Paragraph,
        items: Vec<Item>,
        lone: bool,
    },
    Element {
        start: &'p Event<'static>,
        children: Vec<Tree<'p>>,
        end: &'p Event<'static>,
    },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Tree<'p>>,
    },
}

fn element_name<'e>(event: &'e Event<'_>) -> Option<&'e [u8]> {
    match event {
        Event::Start(start) | Event::Empty(start) => Some(start.name().into_inner()),
        _ => None,
    }
}

fn build_tree(part: &Part) -> Result<Vec<Tree<'_>>, SyntaxError> {
    let mut current = Vec::new();
    let mut open: Vec<(&Event<'static>, Vec<Tree<'_>>)> = Vec::new();
    for node in part.nodes() {
        match node {
            Node::Paragraph(paragraph) => {
                let items = compile(paragraph.text())?;
                let lone = is_lone_marker(&items, paragraph.text());
                current.push(Tree::Paragraph {
                    paragraph,
                    items,
                    lone,
                });
            }
            Node::Markup(event @ Event::Start(_)) => {
                open.push((event, std::mem::take(&mut current)));
            }
            Node::Markup(event @ Event::End(_)) => match open.pop() {
                Some((start, parent)) => {
                    let children = std::mem::replace(&mut current, parent);
                    current.push(Tree::Element {
                        start,
                        children,
                        end: event,
                    });
                }
                None => current.push(Tree::Leaf(event)),
            },
            Node::Markup(event) => current.push(Tree::Leaf(event)),
        }
    }
    // Parsed parts are balanced; anything left open is kept flat.
    while let Some((start, parent)) = open.pop() {
        let children = std::mem::replace(&mut current, parent);
        current.push(Tree::Leaf(start));
        current.extend(children);
    }
    Ok(current)
}

#[derive(Debug)]
struct Marker {
    name: String,
    inverted: bool,
}

/// Section tags under a subtree that still need a partner further out.
/// Closes always precede opens.
#[derive(Debug, Default)]
struct Pending {
    closes: Vec<Marker>,
    opens: Vec<Marker>,
}

/// A section paired between the children `start` and `end` of one element.
struct Span {
    start: usize,
    end: usize,
    order: usize,
    marker: Marker,
}

fn resolve(tree: Tree<'_>) -> Result<(Tree<'_>, Pending), SyntaxError> {
    match tree {
        Tree::Paragraph {
            paragraph,
            items,
            lone,
        } => {
            let mut pending = Pending::default();
            for item in &items {
                match item {
                    Item::Open { name, inverted, .. } => pending.opens.push(Marker {
                        name: name.clone(),
                        inverted: *inverted,
                    }),
                    Item::Close { name, .. } => pending.closes.push(Marker {
                        name: name.clone(),
                        inverted: false,
                    }),
                    _ => {}
                }
            }
            let tree = Tree::Paragraph {
                paragraph,
                items,
                lone,
            };
            Ok((tree, pending))
        }
        Tree::Element {
            start,
            children,
            end,
        } => {
            let row = element_name(start) == Some(b"w:tr".as_slice());
            let (children, pending, spans) = resolve_level(children, row)?;
            let mut tree = Tree::Element {
                start,
                children,
                end,
            };
            // Sections paired across cells repeat the row, innermost first.
            for span in spans {
                tree = Tree::Section {
                    name: span.marker.name,
                    inverted: span.marker.inverted,
                    children: vec![tree],
                };
            }
            Ok((tree, pending))
        }
        leaf => Ok((leaf, Pending::default())),
    }
}

/// Pair the section tags left open by `children`. Unless `row` is set, the
/// pairs are wrapped into sections here and no spans are returned.
fn resolve_level(
    children: Vec<Tree<'_>>,
    row: bool,
) -> Result<(Vec<Tree<'_>>, Pending, Vec<Span>), SyntaxError> {
    let mut resolved = Vec::with_capacity(children.len());
    let mut pending = Pending::default();
    let mut stack: Vec<(usize, Marker)> = Vec::new();
    let mut spans = Vec::new();

    for (index, child) in children.into_iter().enumerate() {
        let (child, below) = resolve(child)?;
        resolved.push(child);
        for close in below.closes {
            let Some((start, open)) = stack.pop() else {
                pending.closes.push(close);
                continue;
            };
            if open.name != close.name {
                return Err(SyntaxError::MismatchedSection {
                    expected: open.name,
                    found: close.name,
                });
            }
            spans.push(Span {
                start,
                end: index,
                order: spans.len(),
                marker: open,
            });
        }
        stack.extend(below.opens.into_iter().map(|open| (index, open)));
    }
    pending.opens = stack.into_iter().map(|(_, open)| open).collect();

    if row || spans.is_empty() {
        return Ok((resolved, pending, spans));
    }

    for span in &spans {
        if let Some(next) = spans.iter().find(|other| other.start == span.end) {
            return Err(SyntaxError::OverlappingSections {
                closed: span.marker.name.clone(),
                opened: next.marker.name.clone(),
            });
        }
    }

    let mut slots: Vec<Option<Tree<'_>>> = resolved.into_iter().map(Some).collect();
    for span in &spans {
        for index in [span.start, span.end] {
            if matches!(slots[index], Some(Tree::Paragraph { lone: true, .. })) {
                slots[index] = None;
            }
        }
    }
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(b.order.cmp(&a.order))
    });
    let len = slots.len();
    let nested = nest(&mut slots, 0, len, &spans);
    Ok((nested, pending, Vec::new()))
}

/// Rebuild `slots[from..to]`, wrapping each span in a section. `spans` are
/// sorted outermost first and all lie inside the range.
fn nest<'p>(
    slots: &mut [Option<Tree<'p>>],
    from: usize,
    to: usize,
    spans: &[Span],
) -> Vec<Tree<'p>> {
    let mut out = Vec::new();
    let mut index = from;
    let mut next = 0;
    while index < to {
        match spans.get(next) {
            Some(span) if span.start == index => {
                let inner = spans[next + 1..]
                    .iter()
                    .take_while(|other| other.start <= span.end)
                    .count();
                let body = &spans[next + 1..next + 1 + inner];
                out.push(Tree::Section {
                    name: span.marker.name.clone(),
                    inverted: span.marker.inverted,
                    children: nest(slots, span.start, span.end + 1, body),
                });
                index = span.end + 1;
                next += 1 + inner;
            }
            _ => {
                out.extend(slots[index].take());
                index += 1;
            }
        }
    }
    out
}

/// Build and resolve a part's tree. Tags unpaired at the top are errors.
fn compile_part(part: &Part) -> Result<Vec<Tree<'_>>, SyntaxError> {
    let (trees, pending, _) = resolve_level(build_tree(part)?, false)?;
    if let Some(close) = pending.closes.into_iter().next() {
        return Err(SyntaxError::UnopenedSection { name: close.name });
    }
    if let Some(open) = pending.opens.into_iter().next() {
        return Err(SyntaxError::UnclosedSection { name: open.name });
    }
    Ok(trees)
}

/// Whether `events` hold a paragraph at their top level.
fn has_paragraph(events: &[Event<'static>]) -> bool {
    let mut depth: usize = 0;
    for event in events {
        match event {
            Event::Start(start) | Event::Empty(start)
                if depth == 0 && start.name().as_ref() == b"w:p" =>
            {
                return true;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn render_trees(trees: &[Tree<'_>], scope: &Scope<'_>, out: &mut Vec<Event<'static>>) {
    for tree in trees {
        match tree {
            Tree::Leaf(event) => out.push((*event).clone()),
            Tree::Paragraph {
                paragraph, items, ..
            } => out.extend(render_paragraph(paragraph, items, scope)),
            Tree::Element {
                start,
                children,
                end,
            } => {
                out.push((*start).clone());
                let mark = out.len();
                render_trees(children, scope, out);
                let container = element_name(start)
                    .is_some_and(|name| PARAGRAPH_CONTAINERS.contains(&name));
                if container && !has_paragraph(&out[mark..]) {
                    out.push(Event::Empty(BytesStart::new("w:p")));
                }
                out.push((*end).clone());
            }
            Tree::Section {
                name,
                inverted,
                children,
            } => {
                for value in iterations(scope.lookup(name), *inverted) {
                    match value {
                        Some(value) => render_trees(children, &scope.child(value), out),
                        None => render_trees(children, scope, out),
                    }
                }
            }
        }
    }
}

fn render_paragraph(
    paragraph: &Paragraph,
    items: &[Item],
    scope: &Scope<'_>,
) -> Vec<Event<'static>> {
    let text = paragraph.text();
    let replacements: Vec<Replacement> = items
        .iter()
        .filter_map(|item| match item {
            Item::Text { .. } => None,
            Item::Value { name, start, end } => Some(Replacement {
                start: *start,
                end: *end,
                text: display(scope.lookup(name)),
            }),
            Item::Open { start, end, .. } | Item::Close { start, end, .. } => Some(Replacement {
                start: *start,
                end: *end,
                text: String::new(),
            }),
            Item::Section { start, end, .. } => {
                let mut rendered = String::new();
                render_inline(std::slice::from_ref(item), text, scope, &mut rendered);
                Some(Replacement {
                    start: *start,
                    end: *end,
                    text: rendered,
                })
            }
        })
        .collect();
    paragraph.rewrite(&replacements)
}

/// Render one part to XML bytes.
fn render_part(part: &Part, mapping: &Mapping) -> Result<Vec<u8>, RenderError> {
    let syntax = |source| RenderError::Syntax {
        part: part.name().to_owned(),
        source,
    };
    let trees = compile_part(part).map_err(syntax)?;
    let mut events = Vec::new();
    render_trees(&trees, &Scope::root(mapping), &mut events);
    write_events(events).map_err(|reason| RenderError::Serialize {
        part: part.name().to_owned(),
        reason,
    })
}

/// Render `package` with `mapping`, producing a new package.
///
/// The mapping is used as given; callers that accept untrusted input must run
/// it through [`crate::namespace::filter`] first.
///
/// # Errors
///
/// Returns [`RenderError::Syntax`] naming the offending part if any templated
/// part has malformed tags or unbalanced sections, and
/// [`RenderError::Serialize`] if the rendered XML cannot be re-read.
pub fn render(package: &Package, mapping: &Mapping) -> Result<Package, RenderError> {
    let mut rendered = Vec::with_capacity(package.parts().len());
    for part in package.parts() {
        rendered.push((part.name().to_owned(), render_part(part, mapping)?));
    }
    package.with_parts(rendered).map_err(|e| match e {
        ArchiveError::MalformedXml { part, reason } => RenderError::Serialize { part, reason },
        other => RenderError::Serialize {
            part: String::new(),
            reason: other.to_string(),
        },
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::package::testing::{archive, document, document_text, docx, paragraph, table};
    use crate::scanner::scan;

    fn mapping(value: Value) -> Mapping {
        match value {
            Value::Object(map) => map,
            _ => Mapping::new(),
        }
    }

    fn render_text(body: &str, data: Value) -> String {
        let package = Package::open(&docx(body)).unwrap();
        let out = render(&package, &mapping(data)).unwrap();
        document_text(&out)
    }

    #[test]
    fn bare_placeholders_are_substituted() {
        let text = render_text(
            &paragraph("Dear t.name, your balance is t.balance."),
            json!({"t.name": "Alex", "t.balance": "100"}),
        );
        assert_eq!(text, "Dear Alex, your balance is 100.");
    }

    #[test]
    fn braced_placeholders_are_substituted_with_their_braces() {
        let text = render_text(
            &paragraph("Dear {t.name}, you owe {t.amount}."),
            json!({"t.name": "Alex", "t.amount": 12.5}),
        );
        assert_eq!(text, "Dear Alex, you owe 12.5.");
    }

    #[test]
    fn missing_values_render_empty() {
        let text = render_text(
            &paragraph("[t.a] [{t.b}] [{other}]"),
            json!({}),
        );
        assert_eq!(text, "[] [] []");
    }

    #[test]
    fn multiline_values_become_breaks() {
        let package = Package::open(&docx(&paragraph("To: t.address"))).unwrap();
        let out = render(&package, &mapping(json!({"t.address": "1 Main St\nSpringfield"}))).unwrap();
        let xml = String::from_utf8(out.entry("word/document.xml").unwrap().to_vec()).unwrap();
        assert!(xml.contains("To: 1 Main St</w:t><w:br/>"), "{xml}");
        assert!(xml.contains(">Springfield</w:t>"), "{xml}");
    }

    #[test]
    fn inline_section_repeats_per_item() {
        let text = render_text(
            &paragraph("Items: {#t.items}{name} x{qty}; {/t.items}end"),
            json!({"t.items": [{"name": "pen", "qty": 2}, {"name": "ink", "qty": 1}]}),
        );
        assert_eq!(text, "Items: pen x2; ink x1; end");
    }

    #[test]
    fn inverted_section_renders_when_falsy() {
        let body = paragraph("{^t.paid}UNPAID{/t.paid}{#t.paid}PAID{/t.paid}");
        assert_eq!(render_text(&body, json!({})), "UNPAID");
        assert_eq!(render_text(&body, json!({"t.paid": ""})), "UNPAID");
        assert_eq!(render_text(&body, json!({"t.paid": "yes"})), "PAID");
    }

    #[test]
    fn paragraph_loop_repeats_paragraphs_and_drops_tag_paragraphs() {
        let body = [
            paragraph("Header"),
            paragraph("{#t.rows}"),
            paragraph("Row {label} of t.owner"),
            paragraph("{/t.rows}"),
            paragraph("Footer"),
        ]
        .concat();
        let text = render_text(
            &body,
            json!({"t.owner": "Sam", "t.rows": [{"label": "A"}, {"label": "B"}]}),
        );
        assert_eq!(text, "Header\nRow A of Sam\nRow B of Sam\nFooter");
    }

    #[test]
    fn paragraph_loop_can_wrap_tables() {
        let body = [
            paragraph("{#t.people}"),
            table(&["{name}", "{age}"]),
            paragraph("{/t.people}"),
        ]
        .concat();
        let text = render_text(
            &body,
            json!({"t.people": [{"name": "Ana", "age": 30}, {"name": "Bo", "age": 41}]}),
        );
        assert_eq!(text, "Ana\n30\nBo\n41");
    }

    #[test]
    fn nested_paragraph_loops() {
        let body = [
            paragraph("{#t.groups}"),
            paragraph("Group {title}"),
            paragraph("{#members}"),
            paragraph("- {.}"),
            paragraph("{/members}"),
            paragraph("{/t.groups}"),
        ]
        .concat();
        let text = render_text(
            &body,
            json!({"t.groups": [
                {"title": "x", "members": ["a", "b"]},
                {"title": "y", "members": []}
            ]}),
        );
        assert_eq!(text, "Group x\n- a\n- b\nGroup y");
    }

    #[test]
    fn section_across_cells_repeats_the_row() {
        let body = table(&["{#t.rows}{name}", "{qty}{/t.rows}"]);
        let text = render_text(
            &body,
            json!({"t.rows": [{"name": "pen", "qty": 2}, {"name": "ink", "qty": 1}]}),
        );
        assert_eq!(text, "pen\n2\nink\n1");
        assert_eq!(render_text(&body, json!({"t.rows": []})), "");
    }

    #[test]
    fn section_opened_mid_paragraph_repeats_the_paragraph_run() {
        let body = [
            paragraph("Items: {#t.items}"),
            paragraph("- {.}"),
            paragraph("{/t.items} end"),
        ]
        .concat();
        let text = render_text(&body, json!({"t.items": ["a", "b"]}));
        assert_eq!(text, "Items: \n- a\n end\nItems: \n- b\n end");
        assert_eq!(render_text(&body, json!({})), "");
    }

    #[test]
    fn section_expands_to_the_common_ancestor() {
        let body = [
            table(&["{#t.rows}", "{name}"]),
            paragraph("{/t.rows}"),
            paragraph("after"),
        ]
        .concat();
        let text = render_text(&body, json!({"t.rows": [{"name": "x"}, {"name": "y"}]}));
        assert_eq!(text, "\nx\n\ny\nafter");
    }

    #[test]
    fn emptied_cell_keeps_a_paragraph() {
        let body = "<w:tbl><w:tr><w:tc>".to_owned()
            + &paragraph("{#t.rows}")
            + &paragraph("{.}")
            + &paragraph("{/t.rows}")
            + "</w:tc></w:tr></w:tbl>";
        let package = Package::open(&docx(&body)).unwrap();
        let out = render(&package, &mapping(json!({"t.rows": []}))).unwrap();
        let xml = String::from_utf8(out.entry("word/document.xml").unwrap().to_vec()).unwrap();
        assert!(xml.contains("<w:tc><w:p/></w:tc>"), "{xml}");

        let out = render(&package, &mapping(json!({"t.rows": ["a"]}))).unwrap();
        let xml = String::from_utf8(out.entry("word/document.xml").unwrap().to_vec()).unwrap();
        assert!(!xml.contains("<w:p/>"), "{xml}");
        assert_eq!(document_text(&out), "a");
    }

    #[test]
    fn emptied_header_keeps_a_paragraph() {
        let header = format!(
            concat!(
                r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
                "{}{}{}</w:hdr>"
            ),
            paragraph("{#t.notes}"),
            paragraph("{.}"),
            paragraph("{/t.notes}"),
        );
        let bytes = archive(&[
            ("word/document.xml", &document(&paragraph("body"))),
            ("word/header1.xml", &header),
        ]);
        let package = Package::open(&bytes).unwrap();
        let out = render(&package, &Mapping::new()).unwrap();
        let xml = String::from_utf8(out.entry("word/header1.xml").unwrap().to_vec()).unwrap();
        assert!(xml.ends_with("<w:p/></w:hdr>"), "{xml}");
    }

    #[test]
    fn unbalanced_sections_across_paragraphs() {
        let cases = [
            (vec!["{#t.a}", "x"], "unclosed"),
            (vec!["x", "{/t.a}"], "unopened"),
            (vec!["{#t.a}", "{/t.b}"], "mismatched"),
            (vec!["{#t.a}", "{/t.a} {#t.b}", "{/t.b}"], "overlapping"),
        ];
        for (paragraphs, kind) in cases {
            let body: String = paragraphs.iter().map(|p| paragraph(p)).collect();
            let package = Package::open(&docx(&body)).unwrap();
            let RenderError::Syntax { source, .. } = render(&package, &Mapping::new()).unwrap_err()
            else {
                panic!("{kind}: expected a syntax error");
            };
            let matched = match kind {
                "unclosed" => matches!(source, SyntaxError::UnclosedSection { .. }),
                "unopened" => matches!(source, SyntaxError::UnopenedSection { .. }),
                "mismatched" => matches!(source, SyntaxError::MismatchedSection { .. }),
                _ => matches!(source, SyntaxError::OverlappingSections { .. }),
            };
            assert!(matched, "{kind}: {source}");
        }
    }

    #[test]
    fn every_scanned_tag_is_replaced() {
        let head = |root: &str, text: &str| {
            format!(
                r#"<w:{root} xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">{}</w:{root}>"#,
                paragraph(text)
            )
        };
        let body = [
            paragraph("Dear t.name, ref {t.ref}"),
            table(&["t.code", "{t.qty} x t.price"]),
            paragraph("Due {t.due_date}."),
        ]
        .concat();
        let bytes = archive(&[
            ("word/document.xml", &document(&body)),
            ("word/header1.xml", &head("hdr", "Case t.case")),
            ("word/footer1.xml", &head("ftr", "{t.page_note}")),
        ]);
        let package = Package::open(&bytes).unwrap();
        let tags = scan(&package);
        assert_eq!(tags.len(), 8);

        let data: Mapping = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.clone(), Value::String(format!("SENTINEL_{i}"))))
            .collect();
        let text = render(&package, &data).unwrap().text();
        for i in 0..tags.len() {
            assert!(text.contains(&format!("SENTINEL_{i}")), "{i} missing: {text}");
        }
        assert!(!text.contains("t."), "{text}");
        assert!(!text.contains('{') && !text.contains('}'), "{text}");
    }

    #[test]
    fn syntax_error_fails_the_whole_render() {
        let body = [paragraph("fine t.a"), paragraph("broken {t.b")].concat();
        let package = Package::open(&docx(&body)).unwrap();
        let err = render(&package, &mapping(json!({"t.a": "x"}))).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Syntax { ref part, source: SyntaxError::UnclosedTag { .. } }
                if part == "word/document.xml"
        ));
    }

    #[test]
    fn source_package_is_unchanged() {
        let bytes = docx(&paragraph("Hello t.name"));
        let package = Package::open(&bytes).unwrap();
        let _ = render(&package, &mapping(json!({"t.name": "Zed"}))).unwrap();
        assert_eq!(document_text(&package), "Hello t.name");
        assert_eq!(scan(&package).len(), 1);
    }
}
