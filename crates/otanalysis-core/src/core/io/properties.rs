use super::error::FormatError;
use std::collections::BTreeMap;

const LINK_MARKER: &str = "*";
const DATE_KEY: &str = "date";

/// A value in a nested property tree.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Scalar(String),
    Node(PropertyTree),
    /// Indirection into a top-level section of the shared-calibration tree,
    /// written as `<target>.*=<index>` in the property file.
    Link { target: String, index: String },
}

/// Nested mapping built from dotted `key=value` property lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTree {
    entries: BTreeMap<String, HeaderValue>,
}

/// Rule set used when flattening a tree into feature-friendly keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderContext {
    Global,
    Shared,
    Segment,
}

/// A parsed property file: its leading date line and the key/value tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyFile {
    pub date: Option<String>,
    pub tree: PropertyTree,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &HeaderValue)> {
        self.entries.iter()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts `value` at the dotted `key`, creating intermediate nodes.
    ///
    /// A trailing `*` segment turns the parent key into a [`HeaderValue::Link`].
    pub fn insert(&mut self, key: &str, value: &str) -> Result<(), FormatError> {
        let mut path: Vec<&str> = key.split('.').collect();
        let leaf = if path.last() == Some(&LINK_MARKER) {
            path.pop();
            let target = path.last().ok_or_else(|| FormatError::Property {
                line: 0,
                reason: format!("link marker without target in '{}'", key),
            })?;
            HeaderValue::Link {
                target: target.to_string(),
                index: value.to_string(),
            }
        } else {
            HeaderValue::Scalar(value.to_string())
        };

        let Some((last, parents)) = path.split_last() else {
            return Err(FormatError::Property {
                line: 0,
                reason: "empty key".to_string(),
            });
        };

        let mut current = self;
        for segment in parents {
            current = match current
                .entries
                .entry(segment.to_string())
                .or_insert_with(|| HeaderValue::Node(PropertyTree::new()))
            {
                HeaderValue::Node(node) => node,
                _ => {
                    return Err(FormatError::KeyCollision {
                        key: key.to_string(),
                    });
                }
            };
        }

        if let Some(HeaderValue::Node(_)) = current.entries.get(*last) {
            return Err(FormatError::KeyCollision {
                key: key.to_string(),
            });
        }
        current.entries.insert(last.to_string(), leaf);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&HeaderValue> {
        let mut current = self;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            let value = current.entries.get(part)?;
            if parts.peek().is_none() {
                return Some(value);
            }
            match value {
                HeaderValue::Node(node) => current = node,
                _ => return None,
            }
        }
        None
    }

    pub fn scalar(&self, path: &str) -> Option<&str> {
        match self.get(path)? {
            HeaderValue::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn node(&self, path: &str) -> Option<&PropertyTree> {
        match self.get(path)? {
            HeaderValue::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the first scalar found among `paths`.
    pub fn first_scalar(&self, paths: &[&str]) -> Option<&str> {
        paths.iter().find_map(|p| self.scalar(p))
    }

    pub fn require(&self, path: &str) -> Result<&str, FormatError> {
        self.scalar(path)
            .ok_or_else(|| FormatError::MissingKey(path.to_string()))
    }

    /// Merges `other` into this tree. Equal scalars pass, differing ones are
    /// a [`FormatError::MergeConflict`].
    pub fn merge(&mut self, other: &PropertyTree) -> Result<(), FormatError> {
        self.merge_at(other, &mut Vec::new())
    }

    fn merge_at(&mut self, other: &PropertyTree, chain: &mut Vec<String>) -> Result<(), FormatError> {
        for (key, incoming) in &other.entries {
            chain.push(key.clone());
            let Some(existing) = self.entries.get_mut(key) else {
                self.entries.insert(key.clone(), incoming.clone());
                chain.pop();
                continue;
            };
            match (existing, incoming) {
                (HeaderValue::Node(mine), HeaderValue::Node(theirs)) => {
                    mine.merge_at(theirs, chain)?;
                }
                (existing, incoming) if *existing == *incoming => {}
                (existing, incoming) => {
                    return Err(FormatError::MergeConflict {
                        key: chain.join("."),
                        existing: describe(existing),
                        incoming: describe(incoming),
                    });
                }
            }
            chain.pop();
        }
        Ok(())
    }

    /// Replaces every link whose target is a top-level section of `shared`
    /// with the referenced shared sub-tree, merged into the link's parent.
    ///
    /// Returns the number of links resolved.
    pub fn resolve_links(&mut self, shared: &PropertyTree) -> Result<usize, FormatError> {
        let mut resolved = 0;

        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in keys {
            if let Some(HeaderValue::Node(child)) = self.entries.get_mut(&key) {
                resolved += child.resolve_links(shared)?;
            }
        }

        let links: Vec<(String, String, String)> = self
            .entries
            .iter()
            .filter_map(|(key, value)| match value {
                HeaderValue::Link { target, index }
                    if target != DATE_KEY && shared.contains_key(target) =>
                {
                    Some((key.clone(), target.clone(), index.clone()))
                }
                _ => None,
            })
            .collect();

        for (key, target, index) in links {
            self.entries.remove(&key);
            let subtree = shared
                .node(&target)
                .and_then(|section| section.node(&index))
                .ok_or_else(|| FormatError::MissingKey(format!("{}.{}", target, index)))?;
            self.merge(subtree)?;
            resolved += 1;
        }
        Ok(resolved)
    }

    /// Dotted `(key, value)` pairs of every scalar in the tree.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for (key, value) in &self.entries {
            let full = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match value {
                HeaderValue::Scalar(s) => out.push((full, s.clone())),
                HeaderValue::Link { index, .. } => {
                    out.push((format!("{}.{}", full, LINK_MARKER), index.clone()))
                }
                HeaderValue::Node(node) => node.flatten_into(&full, out),
            }
        }
    }

    /// Flattens the tree and rewrites its keys for `context`, dropping empty
    /// values and keys no rule applies to.
    pub fn flatten_for(&self, context: HeaderContext) -> BTreeMap<String, String> {
        self.flatten()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(key, value)| context.rewrite_key(&key).map(|k| (k, value)))
            .collect()
    }
}

fn describe(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Scalar(s) => s.clone(),
        HeaderValue::Node(_) => "<section>".to_string(),
        HeaderValue::Link { target, index } => format!("{}.*={}", target, index),
    }
}

impl HeaderContext {
    pub fn rewrite_key(self, key: &str) -> Option<String> {
        match self {
            HeaderContext::Global => {
                let parts = key.split('.').count();
                if parts > 3 {
                    let (_, after) = key.split_once("header")?;
                    let section = after.split("header").next().unwrap_or(after);
                    Some(section.replace(".force-settings", "settings"))
                } else if parts > 2 {
                    Some(key.replace("force-scan-series.", ""))
                } else {
                    None
                }
            }
            HeaderContext::Shared => Some(key.replace("lcd-info.", "")),
            HeaderContext::Segment => {
                if key.starts_with("force-segment-header.environment") {
                    Some(key.replace("force-segment-header.environment.", ""))
                } else if key.starts_with("force-segment-header") {
                    let rest = key.replace("force-segment-header", "");
                    if rest.starts_with(".settings.segment-settings.") {
                        Some(rest.replace(".settings.", ""))
                    } else {
                        Some(rest)
                    }
                } else if key.starts_with("channel") {
                    Some(key.replace("channel.", ""))
                } else {
                    None
                }
            }
        }
    }
}

/// Parses a `key=value` property file.
///
/// A leading `##` line is skipped and the following line is taken as the
/// date. Blank lines, comments and lines without `=` are ignored.
pub fn parse_properties(content: &str) -> Result<PropertyFile, FormatError> {
    let mut lines = content.lines().enumerate().peekable();

    if lines.peek().is_some_and(|(_, line)| line.starts_with("##")) {
        lines.next();
    }

    let date = lines.next().map(|(_, line)| {
        line.strip_prefix('#')
            .unwrap_or(line)
            .trim()
            .to_string()
    });

    let mut tree = PropertyTree::new();
    for (number, line) in lines {
        if line.trim_start().starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim().replace("\\:", ":");
        tree.insert(key, &value).map_err(|e| match e {
            FormatError::Property { reason, .. } => FormatError::Property {
                line: number + 1,
                reason,
            },
            other => other,
        })?;
    }

    Ok(PropertyFile {
        date: date.filter(|d| !d.is_empty()),
        tree,
    })
}

/// Parses one `# key: value` block of a text container.
///
/// Lines before the first `# `-prefixed line are skipped; the block ends at a
/// lone `#`. The first occurrence of a key wins and empty values are dropped.
pub fn parse_text_block<'a, I>(lines: &mut I) -> BTreeMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut block = BTreeMap::new();
    let mut started = false;
    for line in lines {
        let line = line.trim_end();
        if !started {
            if !line.starts_with("# ") {
                continue;
            }
            started = true;
        }
        if line == "#" {
            break;
        }
        let Some(body) = line.strip_prefix('#') else {
            continue;
        };
        let Some((key, value)) = body.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        block
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    block
}
