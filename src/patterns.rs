//! Ordered line classification rules shared by the logcat, kernel and wifi parsers.

use crate::error::{ReportError, Result};
use regex::Regex;

/// How a rule matches the text of a line
#[derive(Debug, Clone)]
pub enum LineMatcher {
    /// Regular expression that must match the whole text
    Regex(Regex),
    /// Substring that must appear somewhere in the text
    Contains(String),
}

impl LineMatcher {
    /// Compile a full-line regular expression.
    ///
    /// The pattern is anchored at both ends, so `.*find.*` is needed to
    /// match a word in the middle of a line.
    pub fn regex(pattern: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{})$", pattern))
            .map(LineMatcher::Regex)
            .map_err(|source| ReportError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn contains(needle: &str) -> Self {
        LineMatcher::Contains(needle.to_string())
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            LineMatcher::Regex(re) => re.is_match(text),
            LineMatcher::Contains(needle) => text.contains(needle.as_str()),
        }
    }
}

/// Level and tag of the line being classified, when the format has them
#[derive(Debug, Clone, Copy, Default)]
pub struct LineContext<'a> {
    pub level: Option<&'a str>,
    pub tag: Option<&'a str>,
}

impl<'a> LineContext<'a> {
    pub fn new(level: &'a str, tag: &'a str) -> Self {
        Self {
            level: Some(level),
            tag: Some(tag),
        }
    }
}

#[derive(Debug, Clone)]
struct PatternRule {
    matcher: Option<LineMatcher>,
    level: Option<String>,
    tag: Option<String>,
    category: String,
}

impl PatternRule {
    fn matches(&self, text: &str, ctx: &LineContext<'_>) -> bool {
        if let Some(level) = &self.level {
            if ctx.level != Some(level.as_str()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if ctx.tag != Some(tag.as_str()) {
                return false;
            }
        }
        match &self.matcher {
            Some(m) => m.is_match(text),
            None => true,
        }
    }
}

/// Ordered set of `(matcher, category)` rules. The first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    rules: Vec<PatternRule>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule that only looks at the line text
    pub fn add_pattern(&mut self, matcher: LineMatcher, category: &str) -> &mut Self {
        self.add_tagged_pattern(Some(matcher), None, None, category)
    }

    /// Append a rule further constrained by log level and tag.
    /// Every part is optional; a rule with none of them matches any line.
    pub fn add_tagged_pattern(
        &mut self,
        matcher: Option<LineMatcher>,
        level: Option<&str>,
        tag: Option<&str>,
        category: &str,
    ) -> &mut Self {
        self.rules.push(PatternRule {
            matcher,
            level: level.map(str::to_string),
            tag: tag.map(str::to_string),
            category: category.to_string(),
        });
        self
    }

    /// Category of the first rule matching `line`, if any
    pub fn classify(&self, line: &str) -> Option<&str> {
        self.classify_with(line, &LineContext::default())
    }

    /// Like [`classify`](Self::classify), with the level and tag of the line
    pub fn classify_with(&self, text: &str, ctx: &LineContext<'_>) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(text, ctx))
            .map(|rule| rule.category.as_str())
    }

    /// Distinct categories, in registration order
    pub fn categories(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !out.contains(&rule.category.as_str()) {
                out.push(rule.category.as_str());
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
