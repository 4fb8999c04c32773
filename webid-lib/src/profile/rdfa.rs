//! RDFa 1.1 extraction from XHTML documents.
//!
//! Implements the core processing rules over `about`, `resource`, `href`,
//! `src`, `rel`, `rev`, `property`, `typeof`, `content`, `datatype`,
//! `vocab`, `prefix` and `xmlns:*`, including chaining through incomplete
//! triples. XML literals are reduced to their text and property copying
//! (`rdfa:copy`) is not performed.

use super::entities::expand_xhtml_entities;
use super::graph::{Graph, Term};
use super::rdfxml::XML_NS;
use super::{parsing_options, text_content, BaseIri, ProfileParseError};
use roxmltree::{Document, Node};
use std::collections::BTreeMap;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const XHTML_VOCAB: &str = "http://www.w3.org/1999/xhtml/vocab#";

/// Prefixes available without declaration (subset of the RDFa initial context).
const INITIAL_PREFIXES: &[(&str, &str)] = &[
    ("cert", "http://www.w3.org/ns/auth/cert#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("rsa", "http://www.w3.org/ns/auth/rsa#"),
    ("schema", "http://schema.org/"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Parse XHTML+RDFa retrieved from `base`.
///
/// XHTML named character references (`&nbsp;`, `&copy;`, ...) are accepted.
pub fn parse_rdfa(text: &str, base: &str) -> Result<Graph, ProfileParseError> {
    let text = expand_xhtml_entities(text);
    let doc = Document::parse_with_options(&text, parsing_options())
        .map_err(|e| ProfileParseError::Markup(e.to_string()))?;

    let mut base = BaseIri::new(base);
    if let Some(href) = doc
        .descendants()
        .find(|n| n.has_tag_name("base"))
        .and_then(|n| n.attribute("href"))
    {
        base = base.rebase(href)?;
    }

    let root = doc.root_element();
    let context = Context {
        parent_subject: base.term(),
        parent_object: base.term(),
        incomplete: Vec::new(),
        prefixes: INITIAL_PREFIXES
            .iter()
            .map(|(p, ns)| (p.to_string(), ns.to_string()))
            .collect(),
        vocab: None,
        language: None,
    };
    let mut processor = RdfaProcessor {
        graph: Graph::new(),
        base,
        root,
    };
    processor.process(root, &context)?;
    Ok(processor.graph)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

#[derive(Debug, Clone)]
struct Incomplete {
    predicate: String,
    direction: Direction,
}

/// Evaluation context inherited by child elements.
#[derive(Debug, Clone)]
struct Context {
    parent_subject: Term,
    parent_object: Term,
    incomplete: Vec<Incomplete>,
    prefixes: BTreeMap<String, String>,
    vocab: Option<String>,
    language: Option<String>,
}

struct RdfaProcessor<'a, 'input> {
    graph: Graph,
    base: BaseIri,
    root: Node<'a, 'input>,
}

impl<'a, 'input> RdfaProcessor<'a, 'input> {
    fn process(&mut self, node: Node<'a, 'input>, parent: &Context) -> Result<(), ProfileParseError> {
        let mut local = parent.clone();
        local.incomplete = Vec::new();

        for ns in node.namespaces() {
            if let Some(prefix) = ns.name() {
                local
                    .prefixes
                    .insert(prefix.to_ascii_lowercase(), ns.uri().to_string());
            }
        }
        if let Some(declarations) = node.attribute("prefix") {
            let mut tokens = declarations.split_whitespace();
            while let (Some(prefix), Some(iri)) = (tokens.next(), tokens.next()) {
                if let Some(prefix) = prefix.strip_suffix(':') {
                    local
                        .prefixes
                        .insert(prefix.to_ascii_lowercase(), iri.to_string());
                }
            }
        }
        match node.attribute("vocab") {
            Some("") => local.vocab = None,
            Some(vocab) => local.vocab = Some(self.base.resolve(vocab)?),
            None => {}
        }
        if let Some(lang) = node
            .attribute((XML_NS, "lang"))
            .or_else(|| node.attribute("lang"))
        {
            local.language = (!lang.is_empty()).then(|| lang.to_ascii_lowercase());
        }

        let rel = self.terms(node.attribute("rel"), &local);
        let rev = self.terms(node.attribute("rev"), &local);
        let property = self.terms(node.attribute("property"), &local);
        let type_of = node.attribute("typeof").map(|v| self.expand_terms(v, &local));
        let about = node
            .attribute("about")
            .map(|v| self.resource(v, &local))
            .transpose()?
            .flatten();
        let resource = node
            .attribute("resource")
            .map(|v| self.resource(v, &local))
            .transpose()?
            .flatten();
        let href = node
            .attribute("href")
            .map(|v| self.base.resolve(v).map(Term::Iri))
            .transpose()?;
        let src = node
            .attribute("src")
            .map(|v| self.base.resolve(v).map(Term::Iri))
            .transpose()?;
        let content = node.attribute("content");
        let datatype = node
            .attribute("datatype")
            .map(|v| self.expand(v, &local).unwrap_or_default());

        let is_root = node == self.root;
        let mut skip = false;
        let mut typed_resource: Option<Term> = None;
        let mut current_object: Option<Term> = None;

        let new_subject = if rel.is_none() && rev.is_none() {
            if property.is_some() && content.is_none() && datatype.is_none() {
                let subject = about
                    .clone()
                    .or_else(|| is_root.then(|| self.base.term()))
                    .unwrap_or_else(|| parent.parent_object.clone());
                if type_of.is_some() {
                    if about.is_some() {
                        typed_resource = Some(subject.clone());
                    } else {
                        let typed = resource
                            .clone()
                            .or_else(|| href.clone())
                            .or_else(|| src.clone())
                            .unwrap_or_else(|| self.graph.fresh_blank());
                        current_object = Some(typed.clone());
                        typed_resource = Some(typed);
                    }
                }
                subject
            } else {
                let subject = match about
                    .clone()
                    .or_else(|| resource.clone())
                    .or_else(|| href.clone())
                    .or_else(|| src.clone())
                    .or_else(|| is_root.then(|| self.base.term()))
                {
                    Some(subject) => subject,
                    None if type_of.is_some() => self.graph.fresh_blank(),
                    None => {
                        skip = property.is_none();
                        parent.parent_object.clone()
                    }
                };
                if type_of.is_some() {
                    typed_resource = Some(subject.clone());
                }
                subject
            }
        } else {
            let subject = about
                .clone()
                .or_else(|| is_root.then(|| self.base.term()))
                .unwrap_or_else(|| parent.parent_object.clone());
            if type_of.is_some() && about.is_some() {
                typed_resource = Some(subject.clone());
            }
            current_object = resource.clone().or_else(|| href.clone()).or_else(|| src.clone());
            if type_of.is_some() && about.is_none() {
                let object = current_object
                    .take()
                    .unwrap_or_else(|| self.graph.fresh_blank());
                current_object = Some(object.clone());
                typed_resource = Some(object);
            }
            subject
        };

        if let (Some(typed), Some(types)) = (&typed_resource, &type_of) {
            for t in types {
                self.graph.insert(typed.clone(), RDF_TYPE, Term::Iri(t.clone()));
            }
        }

        let mut incomplete = Vec::new();
        match &current_object {
            Some(object) => {
                for predicate in rel.iter().flatten() {
                    self.graph
                        .insert(new_subject.clone(), predicate.clone(), object.clone());
                }
                for predicate in rev.iter().flatten() {
                    self.graph
                        .insert(object.clone(), predicate.clone(), new_subject.clone());
                }
            }
            None if rel.is_some() || rev.is_some() => {
                incomplete.extend(rel.iter().flatten().map(|p| Incomplete {
                    predicate: p.clone(),
                    direction: Direction::Forward,
                }));
                incomplete.extend(rev.iter().flatten().map(|p| Incomplete {
                    predicate: p.clone(),
                    direction: Direction::Reverse,
                }));
                current_object = Some(self.graph.fresh_blank());
            }
            None => {}
        }

        if let Some(predicates) = &property {
            let value = if let Some(content) = content {
                self.literal(content.to_string(), datatype.as_deref(), &local)
            } else if let Some(dt) = datatype.as_deref() {
                self.literal(text_content(node), Some(dt), &local)
            } else if rel.is_none() && rev.is_none() {
                match resource.clone().or_else(|| href.clone()).or_else(|| src.clone()) {
                    Some(iri) => iri,
                    None => match (&type_of, &about, &typed_resource) {
                        (Some(_), None, Some(typed)) => typed.clone(),
                        _ => self.literal(text_content(node), None, &local),
                    },
                }
            } else {
                self.literal(text_content(node), None, &local)
            };
            for predicate in predicates {
                self.graph
                    .insert(new_subject.clone(), predicate.clone(), value.clone());
            }
        }

        if !skip {
            for pending in &parent.incomplete {
                match pending.direction {
                    Direction::Forward => self.graph.insert(
                        parent.parent_subject.clone(),
                        pending.predicate.clone(),
                        new_subject.clone(),
                    ),
                    Direction::Reverse => self.graph.insert(
                        new_subject.clone(),
                        pending.predicate.clone(),
                        parent.parent_subject.clone(),
                    ),
                }
            }
        }

        let child_context = if skip {
            Context {
                parent_subject: parent.parent_subject.clone(),
                parent_object: parent.parent_object.clone(),
                incomplete: parent.incomplete.clone(),
                ..local
            }
        } else {
            Context {
                parent_object: current_object.unwrap_or_else(|| new_subject.clone()),
                parent_subject: new_subject,
                incomplete,
                ..local
            }
        };

        for child in node.children().filter(|n| n.is_element()) {
            self.process(child, &child_context)?;
        }
        Ok(())
    }

    fn literal(&self, value: String, datatype: Option<&str>, context: &Context) -> Term {
        match datatype.filter(|dt| !dt.is_empty()) {
            Some(dt) => Term::Literal {
                value,
                datatype: Some(dt.to_string()),
                language: None,
            },
            None => Term::Literal {
                value,
                datatype: None,
                language: context.language.clone(),
            },
        }
    }

    /// Expanded predicate list; `None` when the attribute is absent or
    /// nothing in it resolves.
    fn terms(&self, value: Option<&str>, context: &Context) -> Option<Vec<String>> {
        value
            .map(|v| self.expand_terms(v, context))
            .filter(|terms| !terms.is_empty())
    }

    fn expand_terms(&self, value: &str, context: &Context) -> Vec<String> {
        value
            .split_whitespace()
            .filter_map(|token| self.expand(token, context))
            .collect()
    }

    /// Expand a term, CURIE or absolute IRI.
    fn expand(&self, token: &str, context: &Context) -> Option<String> {
        match token.split_once(':') {
            Some(("_", _)) => None,
            Some((prefix, reference)) => match context.prefixes.get(&prefix.to_ascii_lowercase()) {
                Some(ns) => Some(format!("{}{}", ns, reference)),
                None if prefix.is_empty() => Some(format!("{}{}", XHTML_VOCAB, reference)),
                None => url::Url::parse(token).ok().map(String::from),
            },
            None => context
                .vocab
                .as_ref()
                .map(|vocab| format!("{}{}", vocab, token)),
        }
    }

    /// Resolve `about` / `resource`: safe CURIE, CURIE, blank node or IRI.
    fn resource(&self, value: &str, context: &Context) -> Result<Option<Term>, ProfileParseError> {
        if let Some(safe) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            return Ok(match safe.strip_prefix("_:") {
                Some(label) => Some(document_blank(label)),
                None => self.expand(safe, context).map(Term::Iri),
            });
        }
        if let Some(label) = value.strip_prefix("_:") {
            return Ok(Some(document_blank(label)));
        }
        if let Some((prefix, reference)) = value.split_once(':') {
            if let Some(ns) = context.prefixes.get(&prefix.to_ascii_lowercase()) {
                return Ok(Some(Term::Iri(format!("{}{}", ns, reference))));
            }
        }
        self.base.resolve(value).map(|iri| Some(Term::Iri(iri)))
    }
}

fn document_blank(label: &str) -> Term {
    Term::Blank(format!("id-{}", label))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const CERT: &str = "http://www.w3.org/ns/auth/cert#";

    fn parse(body: &str) -> Graph {
        let doc = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML+RDFa 1.0//EN" "http://www.w3.org/MarkUp/DTD/xhtml-rdfa-1.dtd">
<html xmlns="http://www.w3.org/1999/xhtml"
      xmlns:cert="http://www.w3.org/ns/auth/cert#"
      xmlns:foaf="http://xmlns.com/foaf/0.1/">
  <head><title>Alice</title></head>
  <body>{body}</body>
</html>"#
        );
        parse_rdfa(&doc, "https://alice.example/card").unwrap()
    }

    fn key_of(g: &Graph, subject: &Term) -> Term {
        g.objects(subject, &format!("{CERT}key")).next().cloned().unwrap()
    }

    #[test]
    fn xhtml_named_entities_are_accepted() {
        let g = parse(
            r##"<p about="#me" property="foaf:name">Alice&nbsp;Example&nbsp;&copy;</p>"##,
        );
        let me = Term::iri("https://alice.example/card#me");
        let name = g.objects(&me, "http://xmlns.com/foaf/0.1/name").next().unwrap();
        assert_eq!(name.text(), "Alice\u{a0}Example\u{a0}\u{a9}");
    }

    #[test]
    fn typed_key_chained_through_rel() {
        let g = parse(
            r##"<div about="#me" typeof="foaf:Person" rel="cert:key">
                  <div typeof="cert:RSAPublicKey">
                    <span property="cert:modulus" datatype="xsd:hexBinary">AB01</span>
                    <span property="cert:exponent" content="65537" datatype="xsd:integer">65537</span>
                  </div>
                </div>"##,
        );
        let me = Term::iri("https://alice.example/card#me");
        assert_eq!(
            g.objects(&me, RDF_TYPE).next(),
            Some(&Term::iri("http://xmlns.com/foaf/0.1/Person"))
        );
        let key = key_of(&g, &me);
        assert!(matches!(key, Term::Blank(_)));
        assert_eq!(
            g.objects(&key, RDF_TYPE).next(),
            Some(&Term::iri(format!("{CERT}RSAPublicKey")))
        );
        let modulus = g.objects(&key, &format!("{CERT}modulus")).next().unwrap();
        assert_eq!(modulus.text(), "AB01");
        let exponent = g.objects(&key, &format!("{CERT}exponent")).next().unwrap();
        assert_eq!(
            exponent,
            &Term::Literal {
                value: "65537".into(),
                datatype: Some("http://www.w3.org/2001/XMLSchema#integer".into()),
                language: None,
            }
        );
    }

    #[test]
    fn key_with_explicit_resource() {
        let g = parse(
            r##"<div about="#me">
                  <link rel="cert:key" href="#key"/>
                </div>
                <div about="#key">
                  <span property="cert:modulus">ff00</span>
                  <span property="cert:exponent">3</span>
                </div>"##,
        );
        let key = key_of(&g, &Term::iri("https://alice.example/card#me"));
        assert_eq!(key, Term::iri("https://alice.example/card#key"));
        assert_eq!(
            g.objects(&key, &format!("{CERT}exponent")).next(),
            Some(&Term::literal("3"))
        );
    }

    #[test]
    fn untyped_chaining_uses_a_fresh_node() {
        let g = parse(
            r##"<div about="#me" rel="cert:key">
                  <span property="cert:modulus">ab</span>
                  <span property="cert:exponent">3</span>
                </div>"##,
        );
        let key = key_of(&g, &Term::iri("https://alice.example/card#me"));
        assert_eq!(g.objects(&key, &format!("{CERT}modulus")).count(), 1);
        assert_eq!(g.objects(&key, &format!("{CERT}exponent")).count(), 1);
    }

    #[test]
    fn prefix_attribute_and_vocab() {
        let g = parse(
            r##"<div prefix="c: http://www.w3.org/ns/auth/cert#" about="#me">
                  <span rel="c:key" resource="[_:k]"/>
                </div>
                <div vocab="http://www.w3.org/ns/auth/cert#" about="[_:k]">
                  <span property="exponent">17</span>
                </div>"##,
        );
        let key = key_of(&g, &Term::iri("https://alice.example/card#me"));
        assert_eq!(key, Term::Blank("id-k".into()));
        assert_eq!(
            g.objects(&key, &format!("{CERT}exponent")).next(),
            Some(&Term::literal("17"))
        );
    }

    #[test]
    fn plain_html_yields_no_key_statements() {
        let g = parse(r#"<p>Hello <a href="https://bob.example/">Bob</a></p>"#);
        assert_eq!(g.with_predicate(&format!("{CERT}key")).count(), 0);
    }
}
