//! Cross-reference resolution over the merged tree.

use crate::error::ConfigError;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use strata_rs_protocol::Node;

/// Placeholder syntax: `${path}` or `${path:default}`.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^{}]*)\}").expect("placeholder pattern is valid"));

/// Produces a resolved tree from a merged tree.
///
/// Implementations must be deterministic and must not mutate the input, so
/// the engine can keep serving the previous resolution when one fails.
pub trait Resolver: Send + Sync {
    /// Resolve every reference in `merged`.
    fn resolve(&self, merged: &Node) -> Result<Node, ConfigError>;
}

impl<F> Resolver for F
where
    F: Fn(&Node) -> Result<Node, ConfigError> + Send + Sync,
{
    fn resolve(&self, merged: &Node) -> Result<Node, ConfigError> {
        self(merged)
    }
}

/// Substitutes `${path}` placeholders found in string leaves.
///
/// A string that is exactly one placeholder takes the referenced node as-is,
/// keeping its kind. Placeholders embedded in longer strings interpolate the
/// referenced scalar as text. `${path:default}` falls back to the default
/// string when `path` is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderResolver;

impl Resolver for PlaceholderResolver {
    fn resolve(&self, merged: &Node) -> Result<Node, ConfigError> {
        Resolution::new(merged).node(merged)
    }
}

/// State for one resolution pass.
struct Resolution<'a> {
    /// Merged tree that references are looked up in.
    root: &'a Node,
    /// Already resolved references by path.
    resolved: HashMap<String, Node>,
    /// References currently being resolved, outermost first.
    stack: Vec<String>,
}

impl<'a> Resolution<'a> {
    fn new(root: &'a Node) -> Self {
        Self {
            root,
            resolved: HashMap::new(),
            stack: Vec::new(),
        }
    }

    fn node(&mut self, node: &Node) -> Result<Node, ConfigError> {
        match node {
            Node::String(text) => self.text(text),
            Node::List(items) => items
                .iter()
                .map(|item| self.node(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Node::List),
            Node::Map(map) => {
                let mut out = BTreeMap::new();
                for (key, value) in map {
                    out.insert(key.clone(), self.node(value)?);
                }
                Ok(Node::Map(out))
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn text(&mut self, text: &str) -> Result<Node, ConfigError> {
        let Some(first) = PLACEHOLDER.captures(text) else {
            return Ok(Node::String(text.to_string()));
        };
        if let Some(whole) = first.get(0)
            && whole.start() == 0
            && whole.end() == text.len()
        {
            return self.placeholder(&first[1]);
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            let expr = &caps[1];
            let node = self.placeholder(expr)?;
            push_scalar(&mut out, &node, expr)?;
            last = whole.end();
        }
        out.push_str(&text[last..]);
        Ok(Node::String(out))
    }

    fn placeholder(&mut self, expr: &str) -> Result<Node, ConfigError> {
        let (path, default) = match expr.split_once(':') {
            Some((path, default)) => (path.trim(), Some(default)),
            None => (expr.trim(), None),
        };
        if path.is_empty() {
            return Err(ConfigError::InvalidReference {
                path: expr.to_string(),
                message: "empty placeholder path".to_string(),
            });
        }
        self.reference(path, default)
    }

    fn reference(&mut self, path: &str, default: Option<&str>) -> Result<Node, ConfigError> {
        if let Some(done) = self.resolved.get(path) {
            return Ok(done.clone());
        }
        if let Some(start) = self.stack.iter().position(|entry| entry == path) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(path.to_string());
            return Err(ConfigError::CyclicReference(chain.join(" -> ")));
        }

        let root = self.root;
        let Some(target) = root.get_path(path) else {
            return match default {
                Some(default) => Ok(Node::String(default.to_string())),
                None => Err(ConfigError::UnresolvedReference(path.to_string())),
            };
        };

        self.stack.push(path.to_string());
        let result = self.node(target);
        self.stack.pop();
        let resolved = result?;
        self.resolved.insert(path.to_string(), resolved.clone());
        Ok(resolved)
    }
}

/// Append a scalar's text form; lists and maps cannot be interpolated.
fn push_scalar(out: &mut String, node: &Node, expr: &str) -> Result<(), ConfigError> {
    match node {
        Node::Null => {}
        Node::Bool(flag) => out.push_str(&flag.to_string()),
        Node::Int(int) => out.push_str(&int.to_string()),
        Node::Float(float) => out.push_str(&float.to_string()),
        Node::String(text) => out.push_str(text),
        Node::List(_) | Node::Map(_) => {
            return Err(ConfigError::InvalidReference {
                path: expr.to_string(),
                message: format!("cannot interpolate {} into a string", node.kind()),
            });
        }
    }
    Ok(())
}
