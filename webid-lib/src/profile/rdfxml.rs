//! RDF/XML parsing.
//!
//! Covers the grammar used by WebID profiles in the wild: node elements
//! (`rdf:Description` or typed), `rdf:about` / `rdf:ID` / `rdf:nodeID`,
//! property elements with `rdf:resource`, nested node elements,
//! `rdf:parseType` of `Resource`, `Literal` and `Collection`, typed and
//! language-tagged literals, property attributes, `xml:base` and `rdf:li`.
//! Reification through `rdf:ID` on property elements is not produced.

use super::graph::{Graph, Term};
use super::{parsing_options, text_content, BaseIri, ProfileParseError};
use roxmltree::{Attribute, Document, Node};

pub(crate) const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub(crate) const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
const RDF_XML_LITERAL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral";

/// Attributes on node and property elements that are syntax, not properties.
const SYNTAX_ATTRIBUTES: &[&str] = &[
    "about",
    "ID",
    "nodeID",
    "resource",
    "datatype",
    "parseType",
    "aboutEach",
    "aboutEachPrefix",
    "bagID",
];

/// Parse an RDF/XML document retrieved from `base`.
pub fn parse_rdfxml(text: &str, base: &str) -> Result<Graph, ProfileParseError> {
    let doc = Document::parse_with_options(text, parsing_options())
        .map_err(|e| ProfileParseError::Markup(e.to_string()))?;

    let mut parser = RdfXmlParser {
        graph: Graph::new(),
    };
    let root = doc.root_element();
    let base = rebase(&BaseIri::new(base), root)?;

    if is_rdf(root, "RDF") {
        for child in root.children().filter(|n| n.is_element()) {
            parser.node_element(child, &base)?;
        }
    } else {
        parser.node_element(root, &base)?;
    }
    Ok(parser.graph)
}

struct RdfXmlParser {
    graph: Graph,
}

impl RdfXmlParser {
    /// Process a node element and return the term it describes.
    fn node_element(&mut self, node: Node<'_, '_>, base: &BaseIri) -> Result<Term, ProfileParseError> {
        let base = rebase(base, node)?;

        let subject = if let Some(about) = rdf_attribute(node, "about") {
            Term::Iri(base.resolve(about)?)
        } else if let Some(id) = rdf_attribute(node, "ID") {
            Term::Iri(base.resolve(&format!("#{}", id))?)
        } else if let Some(node_id) = rdf_attribute(node, "nodeID") {
            document_blank(node_id)
        } else {
            self.graph.fresh_blank()
        };

        if !is_rdf(node, "Description") {
            self.graph
                .insert(subject.clone(), RDF_TYPE, Term::Iri(element_iri(node)?));
        }

        self.property_attributes(&subject, node, &base)?;

        let mut li = 0;
        for child in node.children().filter(|n| n.is_element()) {
            self.property_element(&subject, child, &base, &mut li)?;
        }
        Ok(subject)
    }

    fn property_element(
        &mut self,
        subject: &Term,
        node: Node<'_, '_>,
        base: &BaseIri,
        li: &mut usize,
    ) -> Result<(), ProfileParseError> {
        let base = rebase(base, node)?;

        let predicate = if is_rdf(node, "li") {
            *li += 1;
            format!("{}_{}", RDF_NS, li)
        } else {
            element_iri(node)?
        };

        let object = match rdf_attribute(node, "parseType") {
            Some("Resource") => {
                let object = self.graph.fresh_blank();
                let mut inner_li = 0;
                for child in node.children().filter(|n| n.is_element()) {
                    self.property_element(&object, child, &base, &mut inner_li)?;
                }
                object
            }
            Some("Collection") => {
                let mut items = Vec::new();
                for child in node.children().filter(|n| n.is_element()) {
                    items.push(self.node_element(child, &base)?);
                }
                self.collection(items)
            }
            Some(_) => Term::Literal {
                value: inner_markup(node),
                datatype: Some(RDF_XML_LITERAL.to_string()),
                language: None,
            },
            None => self.property_object(node, &base)?,
        };

        self.graph.insert(subject.clone(), predicate, object);
        Ok(())
    }

    /// Object of a property element without `rdf:parseType`.
    fn property_object(&mut self, node: Node<'_, '_>, base: &BaseIri) -> Result<Term, ProfileParseError> {
        let referenced = if let Some(resource) = rdf_attribute(node, "resource") {
            Some(Term::Iri(base.resolve(resource)?))
        } else {
            rdf_attribute(node, "nodeID").map(document_blank)
        };

        if let Some(object) = referenced {
            self.property_attributes(&object, node, base)?;
            return Ok(object);
        }

        if let Some(child) = node.children().find(|n| n.is_element()) {
            return self.node_element(child, base);
        }

        if has_property_attributes(node) {
            let object = self.graph.fresh_blank();
            self.property_attributes(&object, node, base)?;
            return Ok(object);
        }

        let datatype = rdf_attribute(node, "datatype")
            .map(|dt| base.resolve(dt))
            .transpose()?;
        let language = if datatype.is_none() {
            language(node)
        } else {
            None
        };
        Ok(Term::Literal {
            value: text_content(node),
            datatype,
            language,
        })
    }

    /// Property attributes of `node` as statements about `subject`.
    fn property_attributes(
        &mut self,
        subject: &Term,
        node: Node<'_, '_>,
        base: &BaseIri,
    ) -> Result<(), ProfileParseError> {
        for attr in node.attributes().filter(is_property_attribute) {
            let predicate = attribute_iri(&attr);
            let object = if predicate == RDF_TYPE {
                Term::Iri(base.resolve(attr.value())?)
            } else {
                Term::Literal {
                    value: attr.value().to_string(),
                    datatype: None,
                    language: language(node),
                }
            };
            self.graph.insert(subject.clone(), predicate, object);
        }
        Ok(())
    }

    fn collection(&mut self, items: Vec<Term>) -> Term {
        let mut head = Term::iri(RDF_NIL);
        for item in items.into_iter().rev() {
            let cell = self.graph.fresh_blank();
            self.graph.insert(cell.clone(), RDF_FIRST, item);
            self.graph.insert(cell.clone(), RDF_REST, head);
            head = cell;
        }
        head
    }
}

fn is_rdf(node: Node<'_, '_>, local: &str) -> bool {
    node.tag_name().namespace() == Some(RDF_NS) && node.tag_name().name() == local
}

fn rdf_attribute<'a>(node: Node<'a, '_>, local: &str) -> Option<&'a str> {
    node.attribute((RDF_NS, local))
}

fn element_iri(node: Node<'_, '_>) -> Result<String, ProfileParseError> {
    match node.tag_name().namespace() {
        Some(ns) => Ok(format!("{}{}", ns, node.tag_name().name())),
        None => Err(ProfileParseError::Unsupported(format!(
            "element <{}> has no namespace",
            node.tag_name().name()
        ))),
    }
}

fn attribute_iri(attr: &Attribute<'_, '_>) -> String {
    format!("{}{}", attr.namespace().unwrap_or_default(), attr.name())
}

fn is_property_attribute(attr: &Attribute<'_, '_>) -> bool {
    match attr.namespace() {
        None | Some(XML_NS) => false,
        Some(RDF_NS) => !SYNTAX_ATTRIBUTES.contains(&attr.name()),
        Some(_) => true,
    }
}

fn has_property_attributes(node: Node<'_, '_>) -> bool {
    node.attributes().any(|a| is_property_attribute(&a))
}

/// Apply `xml:base` on `node`, if any.
fn rebase(base: &BaseIri, node: Node<'_, '_>) -> Result<BaseIri, ProfileParseError> {
    match node.attribute((XML_NS, "base")) {
        Some(reference) => base.rebase(reference),
        None => Ok(base.clone()),
    }
}

/// In-scope `xml:lang`; an empty value removes the tag.
fn language(node: Node<'_, '_>) -> Option<String> {
    node.ancestors()
        .find_map(|n| n.attribute((XML_NS, "lang")))
        .filter(|lang| !lang.is_empty())
        .map(str::to_ascii_lowercase)
}

/// Blank node for an `rdf:nodeID`, kept apart from parser-minted labels.
fn document_blank(node_id: &str) -> Term {
    Term::Blank(format!("id-{}", node_id))
}

/// Source text between the start and end tags of `node`.
fn inner_markup(node: Node<'_, '_>) -> String {
    let (Some(first), Some(last)) = (node.first_child(), node.last_child()) else {
        return String::new();
    };
    let range = first.range().start..last.range().end;
    node.document()
        .input_text()
        .get(range)
        .unwrap_or_default()
        .to_string()
}
