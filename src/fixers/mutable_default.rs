//! Fixer for shared mutable default arguments (`GST_MUTABLE_DEFAULT_001`).
//!
//! Transforms
//!
//! ```text
//! def foo(items: List[str] = []):      def foo(items: List[str] = None):
//!     ...                          =>      if items is None:
//!                                              items = []
//!                                          ...
//! ```
//!
//! `locate` works on the parsed syntax tree and records where each default
//! sits in the source. `rewrite` splices `None` over exactly those bytes so
//! everything outside the rewritten defaults is preserved byte for byte.

use std::cmp::Reverse;
use std::ops::Range;

use regex::{Captures, Regex};
use tree_sitter::Node;

use crate::planner::action::RescueAction;

use super::python::parse_python;
use super::traits::{Fixer, GeneratedFix};

pub const RULE_ID: &str = "GST_MUTABLE_DEFAULT_001";

const INDENT_UNIT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    List,
    Map,
    Set,
}

impl ContainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Map => "map",
            ContainerKind::Set => "set",
        }
    }
}

/// A parameter whose default is a mutable container.
#[derive(Debug, Clone)]
pub struct MutableDefault {
    pub name: String,
    /// Default expression exactly as written in the source.
    pub literal: String,
    pub kind: ContainerKind,
    /// Byte range of the default expression in the source it was found in.
    pub span: Option<Range<usize>>,
}

impl MutableDefault {
    fn new(name: &str, literal: &str, kind: ContainerKind) -> Self {
        Self {
            name: name.to_string(),
            literal: literal.to_string(),
            kind,
            span: None,
        }
    }
}

// Position is bookkeeping; two entries naming the same default are equal.
impl PartialEq for MutableDefault {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.literal == other.literal && self.kind == other.kind
    }
}

impl Eq for MutableDefault {}

/// Function definition whose declaration starts on `line` (1-based).
///
/// Walks with an explicit stack so deeply nested input cannot exhaust the
/// call stack. Subtrees that do not span the line are pruned.
fn function_at_line<'t>(root: Node<'t>, line: usize) -> Option<Node<'t>> {
    let row = line.checked_sub(1)?;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if row < node.start_position().row || row > node.end_position().row {
            continue;
        }
        if node.kind() == "function_definition" && node.start_position().row == row {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    None
}

struct ParamSlot<'t> {
    name: String,
    default: Option<Node<'t>>,
}

fn node_text<'s>(node: Node<'_>, src: &'s [u8]) -> &'s str {
    node.utf8_text(src).unwrap_or("")
}

fn first_identifier(node: Node<'_>, src: &[u8]) -> Option<String> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier")
        .map(|c| node_text(c, src).to_string());
    found
}

/// Split the parameter list into positional and keyword-only slots.
fn parameter_slots<'t>(params: Node<'t>, src: &[u8]) -> (Vec<ParamSlot<'t>>, Vec<ParamSlot<'t>>) {
    let mut positional = Vec::new();
    let mut keyword_only = Vec::new();
    let mut after_star = false;

    let mut cursor = params.walk();
    for child in params.named_children(&mut cursor) {
        let slot = match child.kind() {
            "identifier" => Some(ParamSlot {
                name: node_text(child, src).to_string(),
                default: None,
            }),
            "typed_parameter" => {
                let mut inner = child.walk();
                let splat = child
                    .named_children(&mut inner)
                    .map(|c| c.kind())
                    .find(|k| *k == "list_splat_pattern" || *k == "dictionary_splat_pattern");
                match splat {
                    Some("list_splat_pattern") => {
                        after_star = true;
                        None
                    }
                    Some(_) => None,
                    None => first_identifier(child, src).map(|name| ParamSlot {
                        name,
                        default: None,
                    }),
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                child.child_by_field_name("name").map(|name| ParamSlot {
                    name: node_text(name, src).to_string(),
                    default: child.child_by_field_name("value"),
                })
            }
            "list_splat_pattern" | "keyword_separator" => {
                after_star = true;
                None
            }
            _ => None,
        };

        if let Some(slot) = slot {
            if after_star {
                keyword_only.push(slot);
            } else {
                positional.push(slot);
            }
        }
    }

    (positional, keyword_only)
}

/// Pair positional defaults with their parameters.
///
/// Defaults bind to the last N positional parameters. A parameter without a
/// default after one with a default is rejected by the interpreter, so such
/// a list yields `None`.
fn align_positional_defaults<'a, 't>(slots: &'a [ParamSlot<'t>]) -> Option<Vec<(&'a str, Node<'t>)>> {
    let defaults: Vec<Node<'t>> = slots.iter().filter_map(|s| s.default).collect();
    let offset = slots.len() - defaults.len();
    if slots[offset..].iter().any(|s| s.default.is_none()) {
        return None;
    }

    Some(
        defaults
            .into_iter()
            .enumerate()
            .map(|(i, default)| (slots[offset + i].name.as_str(), default))
            .collect(),
    )
}

fn container_kind(node: Node<'_>, src: &[u8]) -> Option<ContainerKind> {
    match node.kind() {
        "list" => Some(ContainerKind::List),
        "dictionary" => Some(ContainerKind::Map),
        "set" => Some(ContainerKind::Set),
        "call" => {
            let function = node.child_by_field_name("function")?;
            let arguments = node.child_by_field_name("arguments")?;
            if function.kind() != "identifier" || arguments.kind() != "argument_list" {
                return None;
            }
            let mut cursor = arguments.walk();
            let has_args = arguments
                .named_children(&mut cursor)
                .any(|c| c.kind() != "comment");
            if has_args {
                return None;
            }
            match node_text(function, src) {
                "list" => Some(ContainerKind::List),
                "dict" => Some(ContainerKind::Map),
                "set" => Some(ContainerKind::Set),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Parameters with mutable container defaults on the function declared at
/// `declared_line`, positional first then keyword-only, in source order.
///
/// Returns an empty list when the source does not parse cleanly or no
/// function declaration starts on that line.
pub fn locate(source: &str, declared_line: usize) -> Vec<MutableDefault> {
    let Some(tree) = parse_python(source) else {
        return Vec::new();
    };
    let root = tree.root_node();
    if root.has_error() {
        return Vec::new();
    }
    let Some(function) = function_at_line(root, declared_line) else {
        return Vec::new();
    };
    let Some(params) = function.child_by_field_name("parameters") else {
        return Vec::new();
    };

    let src = source.as_bytes();
    let (positional, keyword_only) = parameter_slots(params, src);
    let Some(mut defaults) = align_positional_defaults(&positional) else {
        return Vec::new();
    };
    defaults.extend(
        keyword_only
            .iter()
            .filter_map(|slot| slot.default.map(|d| (slot.name.as_str(), d))),
    );

    defaults
        .into_iter()
        .filter_map(|(name, node)| {
            let kind = container_kind(node, src)?;
            Some(MutableDefault {
                span: Some(node.start_byte()..node.end_byte()),
                ..MutableDefault::new(name, node_text(node, src), kind)
            })
        })
        .collect()
}

enum LineVerdict {
    Open,
    Closed,
    InlineBody,
}

/// Tracks bracket depth across the lines of a signature, ignoring string
/// literals and comments.
#[derive(Default)]
struct SignatureScanner {
    parens: i32,
    brackets: i32,
    seen_open: bool,
    string: Option<(char, bool)>,
}

impl SignatureScanner {
    fn feed(&mut self, line: &str) -> LineVerdict {
        let chars: Vec<char> = line.chars().collect();
        let mut block_colon = false;
        let mut code_after_colon = false;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if let Some((quote, triple)) = self.string {
                if c == '\\' {
                    i += 2;
                    continue;
                }
                if c == quote {
                    if !triple {
                        self.string = None;
                    } else if chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote) {
                        self.string = None;
                        i += 3;
                        continue;
                    }
                }
                i += 1;
                continue;
            }

            if c == '#' {
                break;
            }
            if block_colon && !c.is_whitespace() {
                code_after_colon = true;
            }

            match c {
                '\'' | '"' => {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    self.string = Some((c, triple));
                    i += if triple { 3 } else { 1 };
                    continue;
                }
                '(' => {
                    self.parens += 1;
                    self.seen_open = true;
                }
                ')' => self.parens -= 1,
                '[' | '{' => self.brackets += 1,
                ']' | '}' => self.brackets -= 1,
                ':' if self.seen_open && self.parens == 0 && self.brackets == 0 && !block_colon => {
                    block_colon = true;
                }
                _ => {}
            }
            i += 1;
        }

        // Single-quoted strings cannot continue onto the next line.
        if matches!(self.string, Some((_, false))) {
            self.string = None;
        }

        match (block_colon, code_after_colon) {
            (true, false) => LineVerdict::Closed,
            (true, true) => LineVerdict::InlineBody,
            (false, _) => LineVerdict::Open,
        }
    }
}

/// Index of the line that closes the signature starting at `start`.
fn signature_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut scanner = SignatureScanner::default();
    for (idx, line) in lines.iter().enumerate().skip(start) {
        match scanner.feed(line) {
            LineVerdict::Closed => return Some(idx),
            LineVerdict::InlineBody => return None,
            LineVerdict::Open => {}
        }
        if scanner.parens < 0 {
            return None;
        }
    }
    None
}

/// Textual fallback for a default without a usable span: replace it with
/// `None`, anchored on the parameter's own declaration.
fn replace_default(signature: &str, param: &MutableDefault) -> Option<String> {
    let pattern = format!(
        r"(?m)(?P<head>(?:^|[(,])\s*{}\s*(?::[^=]*)?=\s*){}(?P<tail>\s*(?:[,)#]|$))",
        regex::escape(&param.name),
        regex::escape(&param.literal),
    );
    let re = Regex::new(&pattern).ok()?;
    if !re.is_match(signature) {
        return None;
    }
    let replaced = re.replacen(signature, 1, |caps: &Captures| {
        format!("{}None{}", &caps["head"], &caps["tail"])
    });
    Some(replaced.into_owned())
}

fn leading_indent(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

fn is_code_line(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

/// Opening quote of a string literal at the start of `stripped`, with the
/// length of any prefix (`r`, `u`, `b`, `f`).
fn string_opener(stripped: &str) -> Option<(&'static str, usize)> {
    let body = stripped.trim_start_matches(['r', 'R', 'u', 'U', 'b', 'B', 'f', 'F']);
    let prefix = stripped.len() - body.len();
    if prefix > 2 {
        return None;
    }
    ["\"\"\"", "'''", "\"", "'"]
        .into_iter()
        .find(|q| body.starts_with(q))
        .map(|q| (q, prefix))
}

enum Docstring {
    Absent,
    EndsAt(usize),
    Unterminated,
}

fn docstring_at(lines: &[&str], idx: usize) -> Docstring {
    let stripped = lines[idx].trim();
    let Some((quote, prefix)) = string_opener(stripped) else {
        return Docstring::Absent;
    };
    let rest = &stripped[prefix + quote.len()..];

    if quote.len() == 1 {
        return if rest.contains(quote) && stripped.ends_with(quote) {
            Docstring::EndsAt(idx)
        } else {
            Docstring::Absent
        };
    }
    if rest.contains(quote) {
        return Docstring::EndsAt(idx);
    }
    lines
        .iter()
        .enumerate()
        .skip(idx + 1)
        .find(|(_, line)| line.contains(quote))
        .map(|(end, _)| Docstring::EndsAt(end))
        .unwrap_or(Docstring::Unterminated)
}

struct BodyLayout {
    insert_at: usize,
    indent: String,
}

fn body_layout(lines: &[&str], sig_end: usize, decl_indent: &str) -> Option<BodyLayout> {
    let mut idx = sig_end + 1;
    while idx < lines.len() && !is_code_line(lines[idx]) {
        idx += 1;
    }

    let mut insert_at = sig_end + 1;
    let mut docstring_indent = None;
    if idx < lines.len() {
        match docstring_at(lines, idx) {
            Docstring::Absent => {}
            Docstring::EndsAt(end) => {
                docstring_indent = Some(leading_indent(lines[idx]).to_string());
                insert_at = end + 1;
                idx = end + 1;
            }
            Docstring::Unterminated => return None,
        }
    }

    let body_indent = lines[idx.min(lines.len())..]
        .iter()
        .find(|line| is_code_line(line))
        .map(|line| leading_indent(line))
        .filter(|indent| indent.len() > decl_indent.len() && indent.starts_with(decl_indent));

    let indent = match (body_indent, docstring_indent) {
        (Some(indent), _) => indent.to_string(),
        (None, Some(indent)) => indent,
        (None, None) => format!("{}{}", decl_indent, INDENT_UNIT),
    };

    Some(BodyLayout { insert_at, indent })
}

/// Result of rewriting one declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    /// Full corrected file text.
    pub text: String,
    /// Rewritten signature, any docstring, and the inserted guards.
    pub replacement: String,
    pub fixed: Vec<MutableDefault>,
    /// Parameters whose default could not be found in the signature.
    pub unmatched: Vec<String>,
}

/// Replace the mutable defaults of the declaration on `declared_line` with
/// `None` and insert per-call guards restoring the original literals.
///
/// Returns `None` when nothing could be rewritten: no parameters, the
/// signature never closes, the body sits on the signature line, or a
/// docstring is unterminated.
pub fn rewrite(source: &str, declared_line: usize, params: &[MutableDefault]) -> Option<Rewrite> {
    if params.is_empty() {
        return None;
    }

    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    let start = declared_line.checked_sub(1)?;
    if start >= lines.len() {
        return None;
    }
    let sig_end = signature_end(&lines, start)?;
    if sig_end + 1 >= lines.len() {
        return None;
    }

    let sig_start: usize = lines[..start].iter().map(|line| line.len()).sum();
    let mut signature = lines[start..=sig_end].concat();
    let sig_stop = sig_start + signature.len();

    let mut splices: Vec<(Range<usize>, usize)> = params
        .iter()
        .enumerate()
        .filter_map(|(idx, param)| {
            let span = param.span.clone()?;
            let in_signature = sig_start <= span.start && span.end <= sig_stop;
            (in_signature && source.get(span.clone()) == Some(param.literal.as_str()))
                .then(|| (span.start - sig_start..span.end - sig_start, idx))
        })
        .collect();
    splices.sort_by_key(|(range, _)| Reverse(range.start));

    // Back to front so earlier offsets stay valid.
    let mut matched = vec![false; params.len()];
    let mut floor = signature.len();
    for (range, idx) in splices {
        if range.end > floor || matched[idx] {
            continue;
        }
        floor = range.start;
        signature.replace_range(range, "None");
        matched[idx] = true;
    }

    for (idx, param) in params.iter().enumerate() {
        if matched[idx] || param.span.is_some() {
            continue;
        }
        if let Some(updated) = replace_default(&signature, param) {
            signature = updated;
            matched[idx] = true;
        }
    }

    let mut fixed = Vec::new();
    let mut unmatched = Vec::new();
    for (param, hit) in params.iter().zip(matched) {
        if hit {
            fixed.push(param);
        } else {
            unmatched.push(param.name.clone());
        }
    }
    if fixed.is_empty() {
        return None;
    }

    let decl_indent = leading_indent(lines[start]);
    let layout = body_layout(&lines, sig_end, decl_indent)?;
    let unit = layout
        .indent
        .strip_prefix(decl_indent)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(INDENT_UNIT);
    let newline = if lines[sig_end].ends_with("\r\n") { "\r\n" } else { "\n" };

    let mut guards = String::new();
    for param in &fixed {
        guards.push_str(&format!(
            "{indent}if {name} is None:{nl}{indent}{unit}{name} = {literal}{nl}",
            indent = layout.indent,
            name = param.name,
            unit = unit,
            literal = param.literal,
            nl = newline,
        ));
    }

    let mut head = lines[sig_end + 1..layout.insert_at].concat();
    if !head.is_empty() && !head.ends_with('\n') {
        head.push_str(newline);
    }
    let replacement = format!("{}{}{}", signature, head, guards);

    let mut text = lines[..start].concat();
    text.push_str(&replacement);
    text.push_str(&lines[layout.insert_at..].concat());

    Some(Rewrite {
        text,
        replacement,
        fixed: fixed.into_iter().cloned().collect(),
        unmatched,
    })
}

pub struct MutableDefaultFixer;

impl Fixer for MutableDefaultFixer {
    fn handles(&self) -> &[&str] {
        &[RULE_ID]
    }

    fn probe(&self, _action: &RescueAction, source: &str, line: usize) -> bool {
        !locate(source, line).is_empty()
    }

    fn generate(&self, action: &RescueAction, source: &str) -> Option<GeneratedFix> {
        let params = locate(source, action.line_start);
        let rewritten = rewrite(source, action.line_start, &params)?;

        let rationale = format!(
            "Replaced mutable default(s) for {} with None pattern. \
             Defaults are evaluated once and shared across calls, so mutations leak between invocations.",
            rewritten
                .fixed
                .iter()
                .map(|p| format!("{} ({})", p.name, p.kind.as_str()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let incomplete = (!rewritten.unmatched.is_empty()).then(|| {
            format!(
                "Could not rewrite default(s) for: {}",
                rewritten.unmatched.join(", ")
            )
        });

        Some(GeneratedFix {
            modified: rewritten.text,
            replacement: rewritten.replacement,
            rationale,
            incomplete,
        })
    }
}
