//! Per-syntax content rendering.
//!
//! Turns an aggregate (namespace → key/value map) into the byte content of
//! a destination file. Rendering is deterministic: namespaces are iterated
//! in the application's configured order and keys are sorted ascending, so
//! the same aggregate always produces identical bytes.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Reserved key carrying the literal file body for passthrough syntaxes.
pub const CONTENT_KEY: &str = "content";

/// Destination file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    /// `key=value` lines with `###namespace###` block headers.
    Env,
    /// `key=value` lines under `[namespace]` section headers.
    Ini,
    /// A PHP file returning a nested array literal.
    Php,
    /// Passthrough of the reserved `content` key.
    Yaml,
    Yml,
    Xml,
    Txt,
}

impl Syntax {
    /// Parses a syntax tag. Unknown or empty tags fall back to [`Syntax::Env`].
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "env" => Self::Env,
            "ini" => Self::Ini,
            "php" => Self::Php,
            "yaml" => Self::Yaml,
            "yml" => Self::Yml,
            "xml" => Self::Xml,
            "txt" => Self::Txt,
            _ => Self::Env,
        }
    }

    /// Derives a syntax from a namespace's file-extension-like suffix.
    ///
    /// `redis.yml` renders as yaml passthrough; `application.properties`
    /// has no recognized suffix and falls back to env.
    pub fn from_namespace(namespace: &str) -> Self {
        Path::new(namespace)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::parse)
            .unwrap_or(Self::Env)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::Ini => "ini",
            Self::Php => "php",
            Self::Yaml => "yaml",
            Self::Yml => "yml",
            Self::Xml => "xml",
            Self::Txt => "txt",
        }
    }

    /// Whether this syntax copies the reserved `content` key verbatim
    /// instead of rendering key/value pairs.
    pub fn is_passthrough(self) -> bool {
        matches!(self, Self::Yaml | Self::Yml | Self::Xml | Self::Txt)
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespace name with its suffix stripped: `mysql.properties` → `mysql`.
pub fn namespace_stem(namespace: &str) -> &str {
    namespace.split('.').next().unwrap_or(namespace)
}

fn sorted_pairs(kv: &HashMap<String, String>) -> Vec<(&String, &String)> {
    let mut pairs: Vec<_> = kv.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
}

/// Renders an all-in-one aggregate into a single file body.
///
/// Namespaces absent from `data` are skipped; the caller's gating decides
/// whether that is acceptable.
pub fn render_multi(
    syntax: Syntax,
    namespaces: &[String],
    data: &HashMap<String, HashMap<String, String>>,
) -> String {
    match syntax {
        Syntax::Env => render_blocks(namespaces, data, BlockHeader::Env),
        Syntax::Ini => render_blocks(namespaces, data, BlockHeader::Ini),
        Syntax::Php => render_php_multi(namespaces, data),
        _ => render_passthrough_multi(namespaces, data),
    }
}

/// Renders a single namespace into its own file body.
pub fn render_single(syntax: Syntax, kv: &HashMap<String, String>) -> String {
    match syntax {
        Syntax::Env | Syntax::Ini => {
            let mut out = String::new();
            for (key, value) in sorted_pairs(kv) {
                out.push_str(key);
                out.push('=');
                out.push_str(value);
                out.push('\n');
            }
            out
        }
        Syntax::Php => {
            let mut out = String::from("<?php\n\nreturn ");
            push_php_map(kv, 1, &mut out);
            out.push_str(";\n");
            out
        }
        _ => kv.get(CONTENT_KEY).cloned().unwrap_or_default(),
    }
}

#[derive(Clone, Copy)]
enum BlockHeader {
    /// `###namespace###` comment line marking the block.
    Env,
    /// `[namespace]` section line.
    Ini,
}

fn render_blocks(
    namespaces: &[String],
    data: &HashMap<String, HashMap<String, String>>,
    header: BlockHeader,
) -> String {
    let mut out = String::new();
    for namespace in namespaces {
        let Some(kv) = data.get(namespace) else {
            continue;
        };
        let stem = namespace_stem(namespace);
        match header {
            BlockHeader::Env => {
                out.push_str("###");
                out.push_str(stem);
                out.push_str("###\n");
            }
            BlockHeader::Ini => {
                out.push('[');
                out.push_str(stem);
                out.push_str("]\n");
            }
        }
        for (key, value) in sorted_pairs(kv) {
            out.push_str(key);
            out.push('=');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn render_php_multi(
    namespaces: &[String],
    data: &HashMap<String, HashMap<String, String>>,
) -> String {
    let mut out = String::from("<?php\n\nreturn [\n");
    for namespace in namespaces {
        let Some(kv) = data.get(namespace) else {
            continue;
        };
        out.push('\t');
        out.push('\'');
        out.push_str(&php_escape(namespace_stem(namespace)));
        out.push_str("' => ");
        push_php_map(kv, 2, &mut out);
        out.push_str(",\n");
    }
    out.push_str("];\n");
    out
}

fn render_passthrough_multi(
    namespaces: &[String],
    data: &HashMap<String, HashMap<String, String>>,
) -> String {
    let bodies: Vec<&str> = namespaces
        .iter()
        .filter_map(|namespace| data.get(namespace))
        .filter_map(|kv| kv.get(CONTENT_KEY))
        .map(String::as_str)
        .collect();
    bodies.join("\n")
}

fn push_php_map(kv: &HashMap<String, String>, depth: usize, out: &mut String) {
    out.push_str("[\n");
    for (key, value) in sorted_pairs(kv) {
        for _ in 0..depth {
            out.push('\t');
        }
        out.push('\'');
        out.push_str(&php_escape(key));
        out.push_str("' => '");
        out.push_str(&php_escape(value));
        out.push_str("',\n");
    }
    for _ in 0..depth.saturating_sub(1) {
        out.push('\t');
    }
    out.push(']');
}

fn php_escape(s: &str) -> String {
    s.replace('\'', "\\'")
}
