use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::messages::{Role, Turn};

/// Template misuse errors. These indicate programming errors, not transient
/// conditions, and are never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A required placeholder was not supplied at render time.
    MissingPlaceholder(String),
    /// A supplied value does not match any placeholder (strict mode only).
    UnknownPlaceholder(String),
    /// The pattern itself is malformed.
    Malformed { position: usize, detail: &'static str },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlaceholder(name) => write!(f, "missing placeholder '{name}'"),
            Self::UnknownPlaceholder(name) => write!(f, "unknown placeholder '{name}'"),
            Self::Malformed { position, detail } => {
                write!(f, "malformed template at byte {position}: {detail}")
            }
        }
    }
}

impl Error for TemplateError {}

/// A text pattern with named `{placeholder}` slots.
///
/// `{{` and `}}` escape literal braces. Constructed once, rendered many
/// times; rendering never mutates the template. Strict by default: supplying
/// a value with no matching placeholder is an error. [`PromptTemplate::lenient`]
/// switches to silently ignoring extras.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pattern: String,
    placeholders: Vec<String>,
    strict: bool,
}

#[derive(Serialize, Deserialize)]
struct TemplateFile {
    pattern: String,
    strict: bool,
}

impl PromptTemplate {
    /// Parses `pattern` and records its required placeholder names.
    pub fn new(pattern: impl Into<String>) -> Result<Self, TemplateError> {
        let pattern = pattern.into();
        let placeholders = scan_placeholders(&pattern)?;
        Ok(Self {
            pattern,
            placeholders,
            strict: true,
        })
    }

    /// Ignore supplied values that match no placeholder instead of failing.
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Placeholder names in order of first appearance.
    pub fn required_placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Substitutes every placeholder occurrence and returns the full text.
    ///
    /// Fails with [`TemplateError::MissingPlaceholder`] naming the first
    /// unsatisfied placeholder in pattern order, or (strict mode) with
    /// [`TemplateError::UnknownPlaceholder`] for a value that matches no
    /// placeholder.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, TemplateError> {
        for name in &self.placeholders {
            if !values.iter().any(|(key, _)| key == name) {
                return Err(TemplateError::MissingPlaceholder(name.clone()));
            }
        }
        if self.strict {
            for (key, _) in values {
                if !self.placeholders.iter().any(|name| name == key) {
                    return Err(TemplateError::UnknownPlaceholder((*key).to_string()));
                }
            }
        }
        Ok(substitute(&self.pattern, values))
    }

    /// Persists the template as JSON.
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
        let file = TemplateFile {
            pattern: self.pattern.clone(),
            strict: self.strict,
        };
        fs::write(path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Loads a template previously written by [`PromptTemplate::save`].
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let raw = fs::read_to_string(path)?;
        let file: TemplateFile = serde_json::from_str(&raw)?;
        let mut template = Self::new(file.pattern)?;
        template.strict = file.strict;
        Ok(template)
    }
}

/// An ordered list of role-tagged templates rendered into a transcript in
/// one shot, e.g. a templated system prompt followed by a templated user
/// question.
#[derive(Debug, Clone)]
pub struct ChatPromptTemplate {
    parts: Vec<(Role, PromptTemplate)>,
    strict: bool,
}

impl ChatPromptTemplate {
    pub fn new(parts: Vec<(Role, &str)>) -> Result<Self, TemplateError> {
        let parts = parts
            .into_iter()
            .map(|(role, pattern)| Ok((role, PromptTemplate::new(pattern)?.lenient())))
            .collect::<Result<Vec<_>, TemplateError>>()?;
        Ok(Self {
            parts,
            strict: true,
        })
    }

    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Renders every part against the same value set. A value unused by all
    /// parts is an [`TemplateError::UnknownPlaceholder`] in strict mode; a
    /// placeholder left unsatisfied in any part fails regardless.
    pub fn format_messages(&self, values: &[(&str, &str)]) -> Result<Vec<Turn>, TemplateError> {
        if self.strict {
            for (key, _) in values {
                let known = self
                    .parts
                    .iter()
                    .any(|(_, template)| template.placeholders.iter().any(|name| name == key));
                if !known {
                    return Err(TemplateError::UnknownPlaceholder((*key).to_string()));
                }
            }
        }
        self.parts
            .iter()
            .map(|(role, template)| {
                Ok(Turn {
                    role: *role,
                    content: template.render(values)?,
                })
            })
            .collect()
    }
}

fn scan_placeholders(pattern: &str) -> Result<Vec<String>, TemplateError> {
    let mut names = Vec::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    continue;
                }
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(TemplateError::Malformed {
                        position,
                        detail: "unclosed placeholder",
                    });
                }
                if name.is_empty()
                    || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(TemplateError::Malformed {
                        position,
                        detail: "placeholder names must be non-empty [A-Za-z0-9_]",
                    });
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    continue;
                }
                return Err(TemplateError::Malformed {
                    position,
                    detail: "stray '}' outside a placeholder",
                });
            }
            _ => {}
        }
    }

    Ok(names)
}

fn substitute(pattern: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if matches!(chars.peek(), Some('{')) {
                    chars.next();
                    output.push('{');
                    continue;
                }
                let mut name = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' {
                        break;
                    }
                    name.push(inner);
                }
                // Coverage was checked up front; missing here is unreachable.
                if let Some((_, value)) = values.iter().find(|(key, _)| *key == name) {
                    output.push_str(value);
                }
            }
            '}' => {
                if matches!(chars.peek(), Some('}')) {
                    chars.next();
                }
                output.push('}');
            }
            other => output.push(other),
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::{ChatPromptTemplate, PromptTemplate, TemplateError};
    use crate::chain::messages::Role;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn render_substitutes_every_placeholder() {
        let template = PromptTemplate::new(
            "Summarize the paper \"{paper}\" in a {style} style. Style: {style}.",
        )
        .unwrap();
        let text = template
            .render(&[("paper", "Attention Is All You Need"), ("style", "beginner")])
            .unwrap();
        assert_eq!(
            text,
            "Summarize the paper \"Attention Is All You Need\" in a beginner style. Style: beginner."
        );
        assert!(!text.contains('{'));
    }

    #[test]
    fn missing_placeholder_is_named_in_pattern_order() {
        let template = PromptTemplate::new("{first} then {second}").unwrap();
        let err = template.render(&[("second", "b")]).unwrap_err();
        assert_eq!(err, TemplateError::MissingPlaceholder("first".to_string()));
    }

    #[test]
    fn strict_mode_rejects_unknown_values() {
        let template = PromptTemplate::new("hello {name}").unwrap();
        let err = template
            .render(&[("name", "world"), ("extra", "x")])
            .unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("extra".to_string()));
    }

    #[test]
    fn lenient_mode_ignores_unknown_values() {
        let template = PromptTemplate::new("hello {name}").unwrap().lenient();
        let text = template
            .render(&[("name", "world"), ("extra", "x")])
            .unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn escaped_braces_render_literally() {
        let template = PromptTemplate::new("json: {{\"k\": \"{v}\"}}").unwrap();
        assert_eq!(
            template.render(&[("v", "1")]).unwrap(),
            "json: {\"k\": \"1\"}"
        );
    }

    #[test]
    fn malformed_patterns_fail_at_construction() {
        assert!(matches!(
            PromptTemplate::new("oops {unclosed"),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("stray } brace"),
            Err(TemplateError::Malformed { .. })
        ));
        assert!(matches!(
            PromptTemplate::new("bad {na me}"),
            Err(TemplateError::Malformed { .. })
        ));
    }

    #[test]
    fn chat_template_formats_role_tagged_turns() {
        let chat = ChatPromptTemplate::new(vec![
            (Role::System, "You are a helpful {domain} assistant."),
            (Role::User, "Tell me something about {topic}."),
        ])
        .unwrap();
        let turns = chat
            .format_messages(&[("domain", "AI"), ("topic", "prompt templates")])
            .unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[0].content, "You are a helpful AI assistant.");
        assert_eq!(turns[1].content, "Tell me something about prompt templates.");
    }

    #[test]
    fn chat_template_rejects_value_unused_by_all_parts() {
        let chat = ChatPromptTemplate::new(vec![(Role::User, "about {topic}")]).unwrap();
        let err = chat
            .format_messages(&[("topic", "x"), ("domain", "y")])
            .unwrap_err();
        assert_eq!(err, TemplateError::UnknownPlaceholder("domain".to_string()));
    }

    #[test]
    fn save_and_load_round_trip() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("lmchain-template-{nanos}.json"));

        let template = PromptTemplate::new("Make a detailed report on the {topic}").unwrap();
        template.save(&path).unwrap();
        let loaded = PromptTemplate::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.required_placeholders(), &["topic".to_string()]);
        assert_eq!(
            loaded.render(&[("topic", "GenAI")]).unwrap(),
            "Make a detailed report on the GenAI"
        );
    }
}
