//! Ordered configuration document.
//!
//! # Responsibilities
//! - Hold sections in first-insertion order
//! - Keep section names unique (re-insert replaces statements in place)
//! - Serialize to the canonical text HAProxy reads
//!
//! # Design Decisions
//! - Statements are never reordered here; builders emit them sorted
//! - Serialization is stable: same document always gives the same bytes

use std::fmt;

use serde::Serialize;

const INDENT: &str = "  ";

/// A named block of configuration statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: String,
    pub statements: Vec<String>,
}

impl Section {
    pub fn new(name: impl Into<String>, statements: Vec<String>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }
}

/// Ordered mapping of section name to statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a section. An existing section with the same name keeps its
    /// position and has its statements replaced; the old statements are
    /// returned.
    pub fn insert(&mut self, section: Section) -> Option<Vec<String>> {
        match self.sections.iter_mut().find(|s| s.name == section.name) {
            Some(existing) => Some(std::mem::replace(
                &mut existing.statements,
                section.statements,
            )),
            None => {
                self.sections.push(section);
                None
            }
        }
    }

    /// Insert every section of `sections` in order.
    pub fn extend<I: IntoIterator<Item = Section>>(&mut self, sections: I) {
        for section in sections {
            self.insert(section);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn into_sections(self) -> Vec<Section> {
        self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Canonical text: section headers flush left, statements indented,
    /// surrounding whitespace trimmed.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for section in &self.sections {
            text.push_str(&section.name);
            text.push('\n');
            for statement in &section.statements {
                text.push_str(INDENT);
                text.push_str(statement);
                text.push('\n');
            }
        }
        text.trim().to_string()
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
