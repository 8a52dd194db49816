//! XML validation against an on-disk XSD.
//!
//! The schema and the document are both read with quick-xml into small
//! element trees. The schema tree becomes a set of element declarations and
//! the document is walked against them, each child checked in the scope of
//! its parent:
//!
//! 1. the document must be well-formed with exactly one root element;
//! 2. the root must match a top-level `xs:element`;
//! 3. every child must be declared in its parent's content model
//!    (`xs:sequence`, `xs:choice`, `xs:all`, nested freely), unless that
//!    model contains `xs:any`;
//! 4. `minOccurs`/`maxOccurs` hold per child name; children of an
//!    `xs:choice` or of an optional group count as optional;
//! 5. attributes declared `use="required"` are present;
//! 6. elements of a simple type contain no child elements.
//!
//! Types resolve through inline `xs:complexType`, named complex types in the
//! same file (with `xs:complexContent` extension) and `ref=` to top-level
//! elements. Child order, facets, `xs:group`, `xs:attributeGroup` and
//! `xs:import`/`xs:include` are not checked; content that depends on them is
//! left open.
//!
//! The validator fails closed: a malformed document, an unreadable schema or
//! any rule violation yields an invalid outcome, and every failure (including
//! each individual violation) is written to the error log.

use crate::errlog::ErrorLog;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result of validating one XML document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Anything that can judge a generated XML document.
pub trait XmlValidator {
    fn validate(&self, xml: &str) -> ValidationOutcome;
}

/// [`XmlValidator`] backed by an XSD file, re-read on every call.
#[derive(Debug, Clone)]
pub struct XsdValidator {
    schema_path: PathBuf,
    log: ErrorLog,
}

impl XsdValidator {
    pub fn new(schema_path: impl Into<PathBuf>, log: ErrorLog) -> Self {
        Self {
            schema_path: schema_path.into(),
            log,
        }
    }

    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    fn fail(&self, summary: String, errors: Vec<String>) -> ValidationOutcome {
        self.log.log(&summary);
        for e in &errors {
            self.log.log(&format!("  - {e}"));
        }
        let mut all = vec![summary];
        all.extend(errors);
        ValidationOutcome::failed(all)
    }
}

impl XmlValidator for XsdValidator {
    fn validate(&self, xml: &str) -> ValidationOutcome {
        let doc = match parse_tree(xml) {
            Ok(d) => d,
            Err(e) => return self.fail(format!("XML is not well-formed: {e}"), Vec::new()),
        };

        if !self.schema_path.exists() {
            return self.fail(
                format!("Schema file not found: {}", self.schema_path.display()),
                Vec::new(),
            );
        }

        let schema_src = match std::fs::read_to_string(&self.schema_path) {
            Ok(s) => s,
            Err(e) => {
                return self.fail(
                    format!(
                        "Could not read schema {}: {e}",
                        self.schema_path.display()
                    ),
                    Vec::new(),
                )
            }
        };

        let schema = match Schema::parse(&schema_src) {
            Ok(s) => s,
            Err(e) => {
                return self.fail(
                    format!(
                        "Schema {} could not be parsed: {e}",
                        self.schema_path.display()
                    ),
                    Vec::new(),
                )
            }
        };

        let errors = schema.check(&doc);
        if errors.is_empty() {
            debug!("XML is valid against {}", self.schema_path.display());
            ValidationOutcome::ok()
        } else {
            self.fail(
                format!(
                    "XML failed validation against {} ({} errors)",
                    self.schema_path.display(),
                    errors.len()
                ),
                errors,
            )
        }
    }
}

// ── Element trees ────────────────────────────────────────────────────────────

/// A parsed element: local name, local attribute names with their values,
/// and child elements. Text content is not kept.
#[derive(Debug, Default)]
struct Node {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Node {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn local_name(qname: &[u8]) -> String {
    let local = match qname.iter().position(|&b| b == b':') {
        Some(i) => &qname[i + 1..],
        None => qname,
    };
    String::from_utf8_lossy(local).into_owned()
}

/// `typ:invoiceType` → `invoiceType`.
fn local_str(qname: &str) -> &str {
    qname.split_once(':').map_or(qname, |(_, local)| local)
}

fn prefix_of(qname: &str) -> Option<&str> {
    qname.split_once(':').map(|(prefix, _)| prefix)
}

fn start_node(e: &BytesStart<'_>) -> Result<Node, String> {
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute: {err}"))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        attrs.push((
            local_name(key),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(Node {
        name: local_name(e.name().as_ref()),
        attrs,
        children: Vec::new(),
    })
}

/// Parse `src` into its root element. Fails unless the input is a
/// well-formed document with exactly one root.
fn parse_tree(src: &str) -> Result<Node, String> {
    let mut reader = Reader::from_str(src);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} at byte {}", reader.buffer_position()))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if stack.is_empty() && root.is_some() {
                    return Err("more than one root element".into());
                }
                let node = start_node(e)?;
                if matches!(event, Event::Start(_)) {
                    stack.push(node);
                } else {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| "closing tag without a matching start".to_string())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(ref t) if stack.is_empty() => {
                let raw = String::from_utf8_lossy(t);
                if !raw.trim().is_empty() {
                    return Err("text outside the root element".into());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unexpected end of document: unclosed element".into());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

// ── Schema model ─────────────────────────────────────────────────────────────

/// What an element declaration allows inside the element.
#[derive(Debug, Clone)]
enum Content {
    Complex(ComplexType),
    /// `type="..."`, resolved at check time.
    Named(String),
    Simple,
    /// No type information (`xs:anyType`); not checked.
    Open,
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    content: Content,
}

#[derive(Debug, Clone)]
enum ParticleTarget {
    Local(ElementDecl),
    /// `ref="..."` to a top-level element.
    Ref(String),
}

/// A child element slot with its effective occurrence bounds.
#[derive(Debug, Clone)]
struct Particle {
    target: ParticleTarget,
    min: u32,
    /// `None` is unbounded.
    max: Option<u32>,
}

impl Particle {
    fn name(&self) -> &str {
        match &self.target {
            ParticleTarget::Local(decl) => &decl.name,
            ParticleTarget::Ref(name) => name,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ComplexType {
    particles: Vec<Particle>,
    required: BTreeSet<String>,
    /// Children not covered by `particles` are accepted (`xs:any`,
    /// `xs:group`, or a base type outside this file).
    open: bool,
    /// `xs:simpleContent`: attributes only, no child elements.
    simple: bool,
    /// `xs:complexContent/xs:extension` base, by local name.
    base: Option<String>,
}

#[derive(Debug, Default)]
struct Schema {
    elements: HashMap<String, ElementDecl>,
    complex_types: HashMap<String, ComplexType>,
    simple_types: HashSet<String>,
}

fn min_occurs(node: &Node) -> Result<u32, String> {
    match node.attr("minOccurs") {
        None => Ok(1),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| format!("invalid minOccurs '{v}'")),
    }
}

fn max_occurs(node: &Node) -> Result<Option<u32>, String> {
    match node.attr("maxOccurs").map(str::trim) {
        None => Ok(Some(1)),
        Some("unbounded") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| format!("invalid maxOccurs '{v}'")),
    }
}

fn times(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.saturating_mul(b)),
        _ => None,
    }
}

fn element_decl(node: &Node) -> Result<ElementDecl, String> {
    let name = node
        .attr("name")
        .ok_or("element declaration without a name")?
        .to_string();
    let content = if let Some(ty) = node.attr("type") {
        Content::Named(ty.to_string())
    } else if let Some(ct) = node.children.iter().find(|c| c.name == "complexType") {
        Content::Complex(complex_type(ct)?)
    } else if node.children.iter().any(|c| c.name == "simpleType") {
        Content::Simple
    } else {
        Content::Open
    };
    Ok(ElementDecl { name, content })
}

fn complex_type(node: &Node) -> Result<ComplexType, String> {
    let mut ct = ComplexType::default();
    collect_content(node, &mut ct)?;
    Ok(ct)
}

/// Walk the children of a `complexType`, or of an extension/restriction
/// inside one.
fn collect_content(node: &Node, ct: &mut ComplexType) -> Result<(), String> {
    for child in &node.children {
        match child.name.as_str() {
            "sequence" | "all" | "choice" => collect_group(child, false, Some(1), ct)?,
            "attribute" => {
                if child.attr("use") == Some("required") {
                    if let Some(name) = child.attr("name").or(child.attr("ref")) {
                        ct.required.insert(local_str(name).to_string());
                    }
                }
            }
            "any" | "group" => ct.open = true,
            "simpleContent" => {
                ct.simple = true;
                for derivation in &child.children {
                    collect_content(derivation, ct)?;
                }
            }
            "complexContent" => {
                for derivation in &child.children {
                    if derivation.name == "extension" {
                        ct.base = derivation.attr("base").map(|b| local_str(b).to_string());
                    }
                    collect_content(derivation, ct)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Flatten a model group into particles. Elements under a `choice` or an
/// optional group become optional; `repeat` carries the enclosing groups'
/// `maxOccurs`.
fn collect_group(
    group: &Node,
    optional: bool,
    repeat: Option<u32>,
    ct: &mut ComplexType,
) -> Result<(), String> {
    let optional = optional || min_occurs(group)? == 0;
    let repeat = times(repeat, max_occurs(group)?);
    let in_choice = group.name == "choice";

    for child in &group.children {
        match child.name.as_str() {
            "element" => {
                let target = match child.attr("ref") {
                    Some(r) => ParticleTarget::Ref(local_str(r).to_string()),
                    None => ParticleTarget::Local(element_decl(child)?),
                };
                ct.particles.push(Particle {
                    target,
                    min: if optional || in_choice {
                        0
                    } else {
                        min_occurs(child)?
                    },
                    max: times(repeat, max_occurs(child)?),
                });
            }
            "sequence" | "all" | "choice" => {
                collect_group(child, optional || in_choice, repeat, ct)?
            }
            "any" | "group" => ct.open = true,
            _ => {}
        }
    }
    Ok(())
}

fn check_simple(node: &Node, errors: &mut Vec<String>) {
    if let Some(child) = node.children.first() {
        errors.push(format!(
            "element <{}> has simple content but contains <{}>",
            node.name, child.name
        ));
    }
}

impl Schema {
    fn parse(src: &str) -> Result<Self, String> {
        let root = parse_tree(src)?;
        if root.name != "schema" {
            return Err(format!("root element is <{}>, expected <schema>", root.name));
        }

        let mut schema = Schema::default();
        for child in &root.children {
            match child.name.as_str() {
                "element" => {
                    let decl = element_decl(child)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    if let Some(name) = child.attr("name") {
                        schema
                            .complex_types
                            .insert(name.to_string(), complex_type(child)?);
                    }
                }
                "simpleType" => {
                    if let Some(name) = child.attr("name") {
                        schema.simple_types.insert(name.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(schema)
    }

    fn check(&self, doc: &Node) -> Vec<String> {
        let mut errors = Vec::new();
        match self.elements.get(&doc.name) {
            Some(decl) => self.check_element(doc, &decl.content, &mut errors),
            None => errors.push(format!(
                "root element <{}> is not declared as a top-level element",
                doc.name
            )),
        }
        errors
    }

    fn is_simple_type(&self, qname: &str) -> bool {
        matches!(prefix_of(qname), Some("xs" | "xsd")) || self.simple_types.contains(local_str(qname))
    }

    fn check_element(&self, node: &Node, content: &Content, errors: &mut Vec<String>) {
        match content {
            Content::Complex(ct) => self.check_complex(node, ct, errors),
            Content::Named(ty) => {
                if self.is_simple_type(ty) {
                    check_simple(node, errors);
                } else if let Some(ct) = self.complex_types.get(local_str(ty)) {
                    self.check_complex(node, ct, errors);
                }
                // Types from imported schemas are left unchecked.
            }
            Content::Simple => check_simple(node, errors),
            Content::Open => {}
        }
    }

    /// `ct` with its extension bases merged in, base particles first.
    fn effective(&self, ct: &ComplexType) -> ComplexType {
        let mut merged = ct.clone();
        let mut base = ct.base.clone();
        let mut seen = HashSet::new();

        while let Some(name) = base {
            if !seen.insert(name.clone()) {
                break;
            }
            let Some(parent) = self.complex_types.get(&name) else {
                merged.open = true;
                break;
            };
            let mut particles = parent.particles.clone();
            particles.append(&mut merged.particles);
            merged.particles = particles;
            merged.required.extend(parent.required.iter().cloned());
            merged.open |= parent.open;
            merged.simple |= parent.simple;
            base = parent.base.clone();
        }
        merged
    }

    fn check_complex(&self, node: &Node, ct: &ComplexType, errors: &mut Vec<String>) {
        let ct = self.effective(ct);

        for attr in &ct.required {
            if node.attr(attr).is_none() {
                errors.push(format!(
                    "element <{}> is missing required attribute '{}'",
                    node.name, attr
                ));
            }
        }

        if ct.simple {
            check_simple(node, errors);
            return;
        }

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for child in &node.children {
            match ct.particles.iter().find(|p| p.name() == child.name) {
                Some(particle) => {
                    *counts.entry(particle.name()).or_default() += 1;
                    match &particle.target {
                        ParticleTarget::Local(decl) => {
                            self.check_element(child, &decl.content, errors)
                        }
                        ParticleTarget::Ref(name) => {
                            if let Some(decl) = self.elements.get(name) {
                                self.check_element(child, &decl.content, errors);
                            }
                        }
                    }
                }
                None if ct.open => {}
                None => errors.push(format!(
                    "element <{}> is not allowed inside <{}>",
                    child.name, node.name
                )),
            }
        }

        // Bounds per child name, summed over every slot with that name.
        let mut bounds: Vec<(&str, u32, Option<u32>)> = Vec::new();
        for p in &ct.particles {
            match bounds.iter_mut().find(|(name, _, _)| *name == p.name()) {
                Some((_, min, max)) => {
                    *min = min.saturating_add(p.min);
                    *max = match (*max, p.max) {
                        (Some(a), Some(b)) => Some(a.saturating_add(b)),
                        _ => None,
                    };
                }
                None => bounds.push((p.name(), p.min, p.max)),
            }
        }

        for (name, min, max) in bounds {
            let found = counts.get(name).copied().unwrap_or(0);
            if found < min {
                errors.push(format!(
                    "element <{}> is missing required child <{}> (expected at least {min}, found {found})",
                    node.name, name
                ));
            }
            if let Some(max) = max {
                if found > max {
                    errors.push(format!(
                        "element <{}> allows at most {max} <{}>, found {found}",
                        node.name, name
                    ));
                }
            }
        }
    }
}
