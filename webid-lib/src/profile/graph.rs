//! In-memory triple graph produced by the profile parsers.

use serde::Serialize;
use std::fmt;
use std::vec;

/// An RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    /// The lexical text of the term: the IRI, the blank node label, or the literal value.
    pub fn text(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Blank(label) => label,
            Term::Literal { value, .. } => value,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }
}

impl fmt::Display for Term {
    /// N-Triples syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Blank(label) => write!(f, "_:{}", label),
            Term::Literal {
                value,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", escape_literal(value))?;
                if let Some(lang) = language {
                    write!(f, "@{}", lang)
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{}>", dt)
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// A single statement. Predicates are always IRIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

/// A set of triples in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Graph {
    triples: Vec<Triple>,
    #[serde(skip)]
    next_blank: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a triple; duplicates are ignored.
    pub fn insert(&mut self, subject: Term, predicate: impl Into<String>, object: Term) {
        let triple = Triple {
            subject,
            predicate: predicate.into(),
            object,
        };
        if !self.triples.contains(&triple) {
            self.triples.push(triple);
        }
    }

    /// Mint a blank node unique within this graph.
    pub fn fresh_blank(&mut self) -> Term {
        self.next_blank += 1;
        Term::Blank(format!("b{}", self.next_blank))
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Objects of `(subject, predicate, ?)`, borrowed from the graph only.
    pub fn objects(&self, subject: &Term, predicate: &str) -> vec::IntoIter<&Term> {
        self.triples
            .iter()
            .filter(|t| &t.subject == subject && t.predicate == predicate)
            .map(|t| &t.object)
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Triples with the given predicate.
    pub fn with_predicate(&self, predicate: &str) -> vec::IntoIter<&Triple> {
        self.triples
            .iter()
            .filter(|t| t.predicate == predicate)
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Render as N-Triples, one statement per line.
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for t in &self.triples {
            out.push_str(&format!("{} <{}> {} .\n", t.subject, t.predicate, t.object));
        }
        out
    }
}
