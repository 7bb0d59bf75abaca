//! Splits a stream of lines into named sections and routes each section's
//! body to the parser registered for it.

use crate::error::{ReportError, Result};
use crate::item::Section;
use crate::parser::{BlockParser, StreamParser};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// `------ MEMORY INFO (/proc/meminfo) ------`
static BUGREPORT_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^------ (?P<name>.+?)(?: \(.*\))? ------$").unwrap()
});

/// `== dumpstate: 2012-04-25 18:33:27`
static DUMPSTATE_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^== (?P<name>dumpstate): .*$").unwrap()
});

/// `DUMP OF SERVICE batterystats:`
static DUMPSYS_SERVICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^DUMP OF SERVICE (?:CRITICAL |HIGH |NORMAL )?(?P<name>[^:\s]+):$").unwrap()
});

/// `--------- 0.022s was the duration of dumpsys wifi, ending at: ...`
static DUMPSYS_TRAILER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-{9} (?P<name>[\d.]+s was the duration of dumpsys .*)$").unwrap()
});

/// Recognizes section boundary lines and extracts the section name
#[derive(Debug, Clone)]
pub struct HeaderSyntax {
    patterns: Vec<Regex>,
}

impl HeaderSyntax {
    /// Each pattern must define a `name` capture group
    pub fn new(patterns: &[&str]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|source| ReportError::InvalidPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Top level bugreport sections plus the dumpstate header
    pub fn bugreport() -> Self {
        Self {
            patterns: vec![DUMPSTATE_HEADER_RE.clone(), BUGREPORT_SECTION_RE.clone()],
        }
    }

    /// Service blocks inside the `DUMPSYS` section
    pub fn dumpsys() -> Self {
        Self {
            patterns: vec![DUMPSYS_SERVICE_RE.clone(), DUMPSYS_TRAILER_RE.clone()],
        }
    }

    /// Section name if `line` is a boundary
    pub fn section_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        let line = line.trim_end();
        self.patterns
            .iter()
            .find_map(|re| re.captures(line).and_then(|c| c.name("name")))
            .map(|m| m.as_str())
    }
}

/// Facts about the whole input shared with every section parser
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SectionContext {
    /// Date the report was taken, used to give year-less timestamps a year
    pub reference_date: Option<NaiveDate>,
}

/// Receives the body of one section
pub trait SectionParser<T> {
    /// Called with the header line when the section opens
    fn begin(&mut self, _header: &str, _ctx: &SectionContext) {
        self.clear();
    }

    fn feed(&mut self, line: &str);

    fn finish(&mut self) -> Option<T>;

    fn clear(&mut self);
}

/// Buffers the section body and hands it to a [`BlockParser`]
pub struct BlockSection<P, F> {
    parser: P,
    wrap: F,
    lines: Vec<String>,
}

impl<P, F> BlockSection<P, F> {
    pub fn new(parser: P, wrap: F) -> Self {
        Self {
            parser,
            wrap,
            lines: Vec::new(),
        }
    }
}

impl<T, P, F> SectionParser<T> for BlockSection<P, F>
where
    P: BlockParser,
    F: Fn(P::Output) -> T,
{
    fn feed(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn finish(&mut self) -> Option<T> {
        let lines = std::mem::take(&mut self.lines);
        self.parser.parse(&lines).map(&self.wrap)
    }

    fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Forwards every body line to a [`StreamParser`]
pub struct StreamSection<P, F> {
    parser: P,
    wrap: F,
}

impl<P, F> StreamSection<P, F> {
    pub fn new(parser: P, wrap: F) -> Self {
        Self { parser, wrap }
    }
}

impl<T, P, F> SectionParser<T> for StreamSection<P, F>
where
    P: StreamParser,
    F: Fn(P::Output) -> T,
{
    fn begin(&mut self, _header: &str, ctx: &SectionContext) {
        self.parser.clear();
        self.parser.configure(ctx);
    }

    fn feed(&mut self, line: &str) {
        self.parser.parse_line(line);
    }

    fn finish(&mut self) -> Option<T> {
        let item = self.parser.finish().map(&self.wrap);
        self.parser.clear();
        item
    }

    fn clear(&mut self) {
        self.parser.clear();
    }
}

/// A known section: its identity, the header names that select it and its parser
pub struct SectionDefinition<T> {
    id: String,
    synonyms: Vec<String>,
    parser: Box<dyn SectionParser<T> + Send>,
}

impl<T> SectionDefinition<T> {
    pub fn new<P>(id: &str, synonyms: &[&str], parser: P) -> Self
    where
        P: SectionParser<T> + Send + 'static,
    {
        Self {
            id: id.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            parser: Box::new(parser),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    fn matches(&self, name: &str) -> bool {
        self.synonyms.iter().any(|s| s == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Seeking,
    InSection(usize),
    Done,
}

/// Result of one section occurrence
#[derive(Debug)]
pub struct SectionOutcome<T> {
    pub id: String,
    pub item: Option<T>,
}

/// Section outcomes in order of appearance
#[derive(Debug)]
pub struct DispatchResult<T> {
    outcomes: Vec<SectionOutcome<T>>,
}

impl<T> DispatchResult<T> {
    /// Take the first parsed occurrence of a section
    pub fn take(&mut self, id: &str) -> Section<T> {
        let mut seen = false;
        for outcome in self.outcomes.iter_mut().filter(|o| o.id == id) {
            seen = true;
            if let Some(item) = outcome.item.take() {
                return Section::Parsed(item);
            }
        }
        if seen {
            Section::Empty
        } else {
            Section::Missing
        }
    }

    pub fn seen(&self, id: &str) -> bool {
        self.outcomes.iter().any(|o| o.id == id)
    }

    /// True when no known section appeared
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn outcomes(&self) -> &[SectionOutcome<T>] {
        &self.outcomes
    }
}

/// Streaming state machine: `Seeking` until a known header, `InSection`
/// while feeding that section's parser, `Done` after [`finish`](Self::finish).
pub struct SectionDispatcher<T> {
    syntax: HeaderSyntax,
    sections: Vec<SectionDefinition<T>>,
    state: DispatchState,
    outcomes: Vec<SectionOutcome<T>>,
    context: SectionContext,
}

impl<T> SectionDispatcher<T> {
    pub fn new(syntax: HeaderSyntax) -> Self {
        Self {
            syntax,
            sections: Vec::new(),
            state: DispatchState::Seeking,
            outcomes: Vec::new(),
            context: SectionContext::default(),
        }
    }

    /// Context handed to sections opened from now on
    pub fn context_mut(&mut self) -> &mut SectionContext {
        &mut self.context
    }

    pub fn with_section(mut self, section: SectionDefinition<T>) -> Self {
        self.sections.push(section);
        self
    }

    pub fn add_section(&mut self, section: SectionDefinition<T>) -> &mut Self {
        self.sections.push(section);
        self
    }

    /// Let another header name select an existing section
    pub fn add_synonym(&mut self, id: &str, name: &str) -> Result<()> {
        let section = self
            .sections
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ReportError::UnknownSection(id.to_string()))?;
        if !section.matches(name) {
            section.synonyms.push(name.to_string());
        }
        Ok(())
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn feed(&mut self, line: &str) {
        if self.state == DispatchState::Done {
            return;
        }

        if let Some(name) = self.syntax.section_name(line) {
            self.close_current();
            match self.sections.iter().position(|s| s.matches(name)) {
                Some(idx) => {
                    self.sections[idx].parser.begin(line, &self.context);
                    self.state = DispatchState::InSection(idx);
                }
                None => {
                    log::trace!("Skipping unknown section '{}'", name);
                    self.state = DispatchState::Seeking;
                }
            }
            return;
        }

        if let DispatchState::InSection(idx) = self.state {
            self.sections[idx].parser.feed(line);
        }
    }

    /// Flush the open section and return every outcome
    pub fn finish(&mut self) -> DispatchResult<T> {
        self.close_current();
        self.state = DispatchState::Done;
        DispatchResult {
            outcomes: std::mem::take(&mut self.outcomes),
        }
    }

    pub fn clear(&mut self) {
        for section in &mut self.sections {
            section.parser.clear();
        }
        self.outcomes.clear();
        self.context = SectionContext::default();
        self.state = DispatchState::Seeking;
    }

    fn close_current(&mut self) {
        if let DispatchState::InSection(idx) = self.state {
            let section = &mut self.sections[idx];
            let item = section.parser.finish();
            if item.is_none() {
                log::debug!("Section '{}' produced no item", section.id);
            }
            self.outcomes.push(SectionOutcome {
                id: section.id.clone(),
                item,
            });
            self.state = DispatchState::Seeking;
        }
    }
}
