//! Built-in interpolation engine.
//!
//! A small mustache-style language, enough for page layouts and stylesheet
//! templates without pulling in a full template engine.
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `{{ name }}` | value, HTML-escaped |
//! | `{{{ name }}}`, `{{& name }}` | value, unescaped |
//! | `{{ a.b.c }}` | dotted lookup into nested objects |
//! | `{{# s }}...{{/ s }}` | arrays repeat, other truthy values render once |
//! | `{{^ s }}...{{/ s }}` | renders when `s` is missing or falsy |
//! | `{{> p }}` | partial |
//! | `{{! c }}` | comment |
//!
//! Names resolve against a context stack: the innermost section value first,
//! then outward to the page view. `.` is the innermost value itself.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use serde_json::Value;
use tracing::trace;

use crate::engine::{EngineError, Partials, RenderEngine};

const MAX_PARTIAL_DEPTH: usize = 32;

#[derive(Debug, PartialEq)]
enum Node<'t> {
    Text(&'t str),
    Var {
        path: &'t str,
        escape: bool,
    },
    Section {
        name: &'t str,
        inverted: bool,
        children: Vec<Node<'t>>,
    },
    Partial(&'t str),
}

enum Tag<'t> {
    Var { path: &'t str, escape: bool },
    Open { name: &'t str, inverted: bool },
    Close(&'t str),
    Partial(&'t str),
    Comment,
}

/// The built-in engine.
#[derive(Debug, Default)]
pub struct Stache {
    registered: RwLock<HashMap<String, String>>,
}

impl Stache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn partial_source(&self, name: &str, partials: &Partials) -> Option<String> {
        if let Some(source) = partials.get(name) {
            return Some(source.clone());
        }
        self.registered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn render_nodes<'v>(
        &self,
        nodes: &[Node<'_>],
        stack: &mut Vec<&'v Value>,
        partials: &Partials,
        depth: usize,
        out: &mut String,
    ) -> Result<(), EngineError> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Var { path, escape } => {
                    if let Some(value) = lookup(stack, path) {
                        let text = stringify(value);
                        if *escape {
                            escape_html(&text, out);
                        } else {
                            out.push_str(&text);
                        }
                    }
                }
                Node::Section {
                    name,
                    inverted,
                    children,
                } => {
                    let value = lookup(stack, name);
                    if *inverted {
                        if !value.is_some_and(is_truthy) {
                            self.render_nodes(children, stack, partials, depth, out)?;
                        }
                        continue;
                    }
                    match value {
                        Some(Value::Array(items)) => {
                            for item in items {
                                stack.push(item);
                                let result = self.render_nodes(children, stack, partials, depth, out);
                                stack.pop();
                                result?;
                            }
                        }
                        Some(value) if is_truthy(value) => {
                            stack.push(value);
                            let result = self.render_nodes(children, stack, partials, depth, out);
                            stack.pop();
                            result?;
                        }
                        _ => {}
                    }
                }
                Node::Partial(name) => {
                    if depth >= MAX_PARTIAL_DEPTH {
                        return Err(EngineError::PartialDepth((*name).to_string()));
                    }
                    let Some(source) = self.partial_source(name, partials) else {
                        trace!(partial = name, "partial not found, rendering nothing");
                        continue;
                    };
                    let nodes = parse(&source)?;
                    self.render_nodes(&nodes, stack, partials, depth + 1, out)?;
                }
            }
        }
        Ok(())
    }
}

impl RenderEngine for Stache {
    fn name(&self) -> &str {
        "stache"
    }

    fn render(
        &self,
        template: &str,
        view: &Value,
        partials: &Partials,
    ) -> Result<String, EngineError> {
        let nodes = parse(template)?;
        let mut out = String::with_capacity(template.len());
        let mut stack = vec![view];
        self.render_nodes(&nodes, &mut stack, partials, 0, &mut out)?;
        Ok(out)
    }

    fn supports_partials(&self) -> bool {
        true
    }

    fn register_partial(&self, name: &str, content: &str) -> Result<(), EngineError> {
        // Reject broken partials up front rather than on every page.
        parse(content)?;
        self.registered
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}

fn parse(template: &str) -> Result<Vec<Node<'_>>, EngineError> {
    let mut current: Vec<Node<'_>> = Vec::new();
    let mut open: Vec<(&str, bool, Vec<Node<'_>>)> = Vec::new();
    let mut pos = 0;

    while let Some(offset) = template[pos..].find("{{") {
        let start = pos + offset;
        if start > pos {
            current.push(Node::Text(&template[pos..start]));
        }

        let (tag, end) = if template[start..].starts_with("{{{") {
            let inner_start = start + 3;
            let close = template[inner_start..]
                .find("}}}")
                .ok_or(EngineError::UnclosedTag(start))?;
            let path = template[inner_start..inner_start + close].trim();
            (Tag::Var { path, escape: false }, inner_start + close + 3)
        } else {
            let inner_start = start + 2;
            let close = template[inner_start..]
                .find("}}")
                .ok_or(EngineError::UnclosedTag(start))?;
            let tag = classify(template[inner_start..inner_start + close].trim(), start)?;
            (tag, inner_start + close + 2)
        };
        pos = end;

        match tag {
            Tag::Var { path, .. } if path.is_empty() => return Err(EngineError::EmptyTag(start)),
            Tag::Var { path, escape } => current.push(Node::Var { path, escape }),
            Tag::Open { name, inverted } => {
                open.push((name, inverted, std::mem::take(&mut current)));
            }
            Tag::Close(name) => {
                let Some((open_name, inverted, parent)) = open.pop() else {
                    return Err(EngineError::UnexpectedClose(name.to_string()));
                };
                if open_name != name {
                    return Err(EngineError::UnexpectedClose(name.to_string()));
                }
                let children = std::mem::replace(&mut current, parent);
                current.push(Node::Section {
                    name,
                    inverted,
                    children,
                });
            }
            Tag::Partial(name) => current.push(Node::Partial(name)),
            Tag::Comment => {}
        }
    }

    if let Some((name, _, _)) = open.pop() {
        return Err(EngineError::UnclosedSection(name.to_string()));
    }
    if pos < template.len() {
        current.push(Node::Text(&template[pos..]));
    }
    Ok(current)
}

fn classify(inner: &str, start: usize) -> Result<Tag<'_>, EngineError> {
    let Some(sigil) = inner.chars().next() else {
        return Err(EngineError::EmptyTag(start));
    };
    let rest = inner[sigil.len_utf8()..].trim();
    let named = |name: &str| {
        if name.is_empty() {
            Err(EngineError::EmptyTag(start))
        } else {
            Ok(())
        }
    };

    let tag = match sigil {
        '!' => Tag::Comment,
        '#' => {
            named(rest)?;
            Tag::Open { name: rest, inverted: false }
        }
        '^' => {
            named(rest)?;
            Tag::Open { name: rest, inverted: true }
        }
        '/' => {
            named(rest)?;
            Tag::Close(rest)
        }
        '>' => {
            named(rest)?;
            Tag::Partial(rest)
        }
        '&' => Tag::Var { path: rest, escape: false },
        _ => Tag::Var { path: inner, escape: true },
    };
    Ok(tag)
}

fn lookup<'v>(stack: &[&'v Value], path: &str) -> Option<&'v Value> {
    if path == "." {
        return stack.last().copied();
    }

    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut value = stack
        .iter()
        .rev()
        .find_map(|ctx| ctx.as_object().and_then(|obj| obj.get(first)))?;

    for segment in segments {
        value = match value {
            Value::Object(obj) => obj.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}
