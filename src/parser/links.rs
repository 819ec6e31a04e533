use crate::config::Config;
use crate::mapping::SourcePosition;
use crate::parser::scanner::Token;
use crate::parser::SourceChar;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    // 200px, x120px, 200x120px
    static ref SIZE_OPTION: Regex = Regex::new(r"^\d*(?:x\d+)?\s*px$").unwrap();
    static ref PARAM_OPTION: Regex =
        Regex::new(r"^(?:alt|link|upright|hochkant|page|class|lang|thumb|thumbnail|mini|miniatur)\s*=").unwrap();
}

/// Longest namespace or language prefix we try to classify
const MAX_PREFIX_LEN: usize = 40;

/// Resolved markup: plain chars, or a group of nodes standing in for a link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Char(SourceChar),
    Group(Vec<Node>),
}

/// Visit every char below `nodes` in order, without recursion.
pub fn walk(nodes: Vec<Node>, mut visit: impl FnMut(SourceChar)) {
    let mut stack = vec![nodes.into_iter()];
    while let Some(top) = stack.last_mut() {
        match top.next() {
            Some(Node::Char(c)) => visit(c),
            Some(Node::Group(children)) => stack.push(children.into_iter()),
            None => {
                stack.pop();
            }
        }
    }
}

/// Drop a subtree iteratively, so deep nesting cannot exhaust the stack.
fn discard(nodes: Vec<Node>) {
    walk(nodes, |_| {});
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[[pt:Artigo]]`
    Interlanguage,
    /// `[[File:x.jpg|thumb|caption]]`
    Media,
    /// `[[Category:Foo]]`
    Category,
    Ordinary,
}

/// How resolved links are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Links become their display text
    PlainText,
    /// Only interlanguage, category and media links are rewritten; media links
    /// keep `[[caption]]`, everything else stays as written
    StripLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Link,
    External,
}

/// An opened but not yet closed bracket construct
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    open: Token,
    segments: Vec<Vec<Node>>,
    /// Chars splitting the segments: pipes in links, the first blank in external links
    separators: Vec<SourceChar>,
}

impl Frame {
    fn new(kind: FrameKind, open: Token) -> Self {
        Self {
            kind,
            open,
            segments: vec![Vec::new()],
            separators: Vec::new(),
        }
    }

    fn current(&mut self) -> &mut Vec<Node> {
        if self.segments.is_empty() {
            self.segments.push(Vec::new());
        }
        let last = self.segments.len() - 1;
        &mut self.segments[last]
    }

    fn split(&mut self, separator: SourceChar) {
        self.separators.push(separator);
        self.segments.push(Vec::new());
    }

    /// The frame exactly as written, inner links already resolved
    fn into_literal(self, close: Option<Token>) -> Node {
        let mut nodes: Vec<Node> = self.open.literal().into_iter().map(Node::Char).collect();
        nodes.extend(interleave(self.segments, self.separators));
        if let Some(close) = close {
            nodes.extend(close.literal().into_iter().map(Node::Char));
        }
        Node::Group(nodes)
    }
}

/// Where output for the innermost open construct goes
fn current<'a>(stack: &'a mut [Frame], root: &'a mut Vec<Node>) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => frame.current(),
        None => root,
    }
}

/// `segments` joined by their separator chars
fn interleave(segments: Vec<Vec<Node>>, separators: Vec<SourceChar>) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(segments.len() * 2);
    let mut separators = separators.into_iter();
    for (index, segment) in segments.into_iter().enumerate() {
        if index > 0 {
            if let Some(separator) = separators.next() {
                nodes.push(Node::Char(separator));
            }
        }
        nodes.push(Node::Group(segment));
    }
    nodes
}

/// Chars of a segment, or `None` if it holds a nested link
fn segment_text(segment: &[Node]) -> Option<String> {
    segment
        .iter()
        .map(|node| match node {
            Node::Char(c) => Some(c.ch),
            Node::Group(_) => None,
        })
        .collect()
}

fn is_blank(segment: &[Node]) -> bool {
    segment
        .iter()
        .all(|node| matches!(node, Node::Char(c) if c.ch.is_whitespace()))
}

fn normalize_name(name: &str) -> String {
    name.trim().replace('_', " ").to_lowercase()
}

fn name_table(names: &[String]) -> HashSet<String> {
    names.iter().map(|name| normalize_name(name)).collect()
}

/// Classifies links by their target prefix, using the configured tables
#[derive(Debug, Clone)]
pub struct LinkRules {
    interlanguage_codes: HashSet<String>,
    media_namespaces: HashSet<String>,
    category_namespaces: HashSet<String>,
    media_options: HashSet<String>,
}

impl LinkRules {
    pub fn new(config: &Config) -> Self {
        Self {
            interlanguage_codes: name_table(&config.interlanguage_codes),
            media_namespaces: name_table(&config.media_namespaces),
            category_namespaces: name_table(&config.category_namespaces),
            media_options: name_table(&config.media_options),
        }
    }

    /// Kind of a link with the given target, plus whether it started with a colon
    pub fn classify(&self, target: &[Node]) -> (LinkKind, bool) {
        let mut prefix = String::new();
        let mut leading_colon = false;
        let mut seen_text = false;

        for node in target {
            let ch = match node {
                Node::Char(c) => c.ch,
                Node::Group(_) => break,
            };
            if !seen_text && ch.is_whitespace() {
                continue;
            }
            if !seen_text && ch == ':' {
                leading_colon = true;
                seen_text = true;
                continue;
            }
            seen_text = true;
            if ch == ':' {
                if leading_colon {
                    break;
                }
                return (self.kind_of_prefix(&prefix), false);
            }
            if ch == '\n' || prefix.chars().count() >= MAX_PREFIX_LEN {
                break;
            }
            prefix.push(ch);
        }
        (LinkKind::Ordinary, leading_colon)
    }

    fn kind_of_prefix(&self, prefix: &str) -> LinkKind {
        let name = normalize_name(prefix);
        if self.interlanguage_codes.contains(&name) {
            LinkKind::Interlanguage
        } else if self.media_namespaces.contains(&name) {
            LinkKind::Media
        } else if self.category_namespaces.contains(&name) {
            LinkKind::Category
        } else {
            LinkKind::Ordinary
        }
    }

    /// Layout options of file/image links: keywords, sizes and known parameters
    pub fn is_media_option(&self, segment: &[Node]) -> bool {
        match segment_text(segment) {
            Some(text) => {
                let text = text.trim().to_lowercase();
                self.media_options.contains(&text)
                    || SIZE_OPTION.is_match(&text)
                    || PARAM_OPTION.is_match(&text)
            }
            None => false,
        }
    }

    /// Build the resolved tree from a token stream.
    ///
    /// Brackets are matched with an explicit stack; unclosed constructs are
    /// passed through as written.
    pub fn resolve(&self, tokens: &[Token], rendering: Rendering) -> Vec<Node> {
        let mut root = Vec::new();
        let mut stack: Vec<Frame> = Vec::new();

        for &token in tokens {
            let top_kind = stack.last().map(|frame| frame.kind);
            match token {
                Token::Char(c) => {
                    let ends_url = top_kind == Some(FrameKind::External)
                        && stack.last().is_some_and(|frame| frame.segments.len() == 1)
                        && c.ch.is_whitespace();
                    if ends_url {
                        if let Some(frame) = stack.last_mut() {
                            frame.split(c);
                        }
                    } else {
                        current(&mut stack, &mut root).push(Node::Char(c));
                    }
                }
                Token::Pipe(at) if top_kind == Some(FrameKind::Link) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.split(SourceChar::new('|', at));
                    }
                }
                Token::LinkOpen(_) => stack.push(Frame::new(FrameKind::Link, token)),
                Token::ExternalOpen(_) => stack.push(Frame::new(FrameKind::External, token)),
                Token::LinkClose(_) if top_kind == Some(FrameKind::Link) => {
                    if let Some(frame) = stack.pop() {
                        let node = self.close_link(frame, token, rendering);
                        current(&mut stack, &mut root).push(node);
                    }
                }
                Token::ExternalClose(_) if top_kind == Some(FrameKind::External) => {
                    if let Some(frame) = stack.pop() {
                        let node = close_external(frame, token, rendering);
                        current(&mut stack, &mut root).push(node);
                    }
                }
                Token::LinkClose(at) if top_kind == Some(FrameKind::External) => {
                    // `]]` after an external link: the first bracket closes it
                    if let Some(frame) = stack.pop() {
                        let node = close_external(frame, Token::ExternalClose(at), rendering);
                        let second = SourcePosition::new(at.line, at.column + 1);
                        let parent = current(&mut stack, &mut root);
                        parent.push(node);
                        parent.push(Node::Char(SourceChar::new(']', second)));
                    }
                }
                Token::Pipe(_) | Token::LinkClose(_) | Token::ExternalClose(_) => {
                    current(&mut stack, &mut root)
                        .extend(token.literal().into_iter().map(Node::Char));
                }
            }
        }

        if let Some(outermost) = stack.first() {
            let at = match outermost.open {
                Token::LinkOpen(at) | Token::ExternalOpen(at) => at,
                other => other.literal()[0].position,
            };
            tracing::warn!(
                unclosed = stack.len(),
                line = at.line,
                column = at.column,
                "unclosed brackets passed through as text"
            );
        }
        while let Some(frame) = stack.pop() {
            let node = frame.into_literal(None);
            current(&mut stack, &mut root).push(node);
        }

        root
    }

    fn close_link(&self, mut frame: Frame, close: Token, rendering: Rendering) -> Node {
        let (kind, leading_colon) = self.classify(&frame.segments[0]);
        match kind {
            LinkKind::Interlanguage => {
                discard(frame.segments.into_iter().flatten().collect());
                Node::Group(Vec::new())
            }
            LinkKind::Category => {
                // only links nested after the target survive, e.g. `[[Category:X|[[Y]]]]`
                let mut segments = frame.segments.into_iter();
                let mut kept = Vec::new();
                if let Some(target) = segments.next() {
                    discard(target);
                }
                for node in segments.flatten() {
                    match node {
                        Node::Group(children) if !children.is_empty() => {
                            kept.push(Node::Group(children))
                        }
                        other => discard(vec![other]),
                    }
                }
                wrap_kept(kept, frame.open, close, rendering)
            }
            LinkKind::Media => {
                let caption = (1..frame.segments.len())
                    .rev()
                    .find(|&index| !self.is_media_option(&frame.segments[index]))
                    .map(|index| frame.segments.remove(index));
                discard(frame.segments.into_iter().flatten().collect());
                wrap_kept(caption.unwrap_or_default(), frame.open, close, rendering)
            }
            LinkKind::Ordinary => match rendering {
                Rendering::StripLinks => frame.into_literal(Some(close)),
                Rendering::PlainText => {
                    let mut segments = frame.segments.into_iter();
                    let mut target = segments.next().unwrap_or_default();
                    let display: Vec<Vec<Node>> = segments.collect();
                    if display.iter().all(|segment| is_blank(segment)) {
                        discard(display.into_iter().flatten().collect());
                        if leading_colon {
                            strip_leading_colon(&mut target);
                        }
                        Node::Group(target)
                    } else {
                        discard(target);
                        let pipes = frame.separators.into_iter().skip(1).collect();
                        Node::Group(interleave(display, pipes))
                    }
                }
            },
        }
    }
}

/// What a media or category link leaves behind. `[[kept]]` when only links
/// are being stripped, and nothing at all when nothing was kept.
fn wrap_kept(kept: Vec<Node>, open: Token, close: Token, rendering: Rendering) -> Node {
    if kept.is_empty() {
        return Node::Group(kept);
    }
    match rendering {
        Rendering::PlainText => Node::Group(kept),
        Rendering::StripLinks => {
            let mut nodes: Vec<Node> = open.literal().into_iter().map(Node::Char).collect();
            nodes.push(Node::Group(kept));
            nodes.extend(close.literal().into_iter().map(Node::Char));
            Node::Group(nodes)
        }
    }
}

fn close_external(mut frame: Frame, close: Token, rendering: Rendering) -> Node {
    match rendering {
        Rendering::StripLinks => frame.into_literal(Some(close)),
        Rendering::PlainText => {
            let label = if frame.segments.len() > 1 {
                frame.segments.pop().unwrap_or_default()
            } else {
                Vec::new()
            };
            discard(frame.segments.into_iter().flatten().collect());
            Node::Group(label)
        }
    }
}

fn strip_leading_colon(target: &mut Vec<Node>) {
    let first_text = target
        .iter()
        .position(|node| !matches!(node, Node::Char(c) if c.ch.is_whitespace()));
    if let Some(index) = first_text {
        if matches!(target[index], Node::Char(c) if c.ch == ':') {
            target.remove(index);
        }
    }
}
