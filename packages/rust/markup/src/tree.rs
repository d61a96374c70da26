//! Arena-backed, order-preserving markup tree.
//!
//! Every node lives in [`Document`]'s arena and is addressed by a [`NodeId`].
//! An element holds one ordered field map in which attributes and child
//! elements share a single namespace: a name appears at most once per
//! element, and each [`Field`] remembers whether it came from an attribute or
//! a child element so it can be rendered back the same way. Sibling child
//! elements with the same name fold into a [`MarkupNode::Group`].
//!
//! Text and attribute values are stored raw, exactly as they appeared in the
//! source (entity references still escaped). Callers writing new values must
//! pass already-escaped text.

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// Attribute value, or a child element holding only text.
    Scalar(String),
    /// Element with attributes and/or child elements.
    Element(Element),
    /// Sibling elements sharing one tag, in source order.
    Group(Vec<NodeId>),
}

/// Whether a field is rendered as an attribute or as a child element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Attribute,
    Child,
}

/// One named entry in an element's field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub node: NodeId,
}

/// Ordered field map plus optional raw character data (mixed content).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    fields: Vec<Field>,
    text: Option<String>,
}

impl Element {
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Attribute)
    }

    pub fn children(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Child)
    }

    /// Raw character data that sits alongside child fields.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.text.is_none()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Index where a new field of `kind` goes: attributes after the last
    /// attribute, children ahead of every existing child.
    fn insert_position(&self, kind: FieldKind) -> usize {
        match kind {
            FieldKind::Attribute => self
                .fields
                .iter()
                .rposition(|f| f.kind == FieldKind::Attribute)
                .map_or(0, |i| i + 1),
            FieldKind::Child => self
                .fields
                .iter()
                .position(|f| f.kind == FieldKind::Child)
                .unwrap_or(self.fields.len()),
        }
    }

    pub(crate) fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }
}

/// A parsed markup document: node arena, root handle and prolog.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<MarkupNode>,
    root: NodeId,
    root_name: String,
    declaration: Option<String>,
}

impl Document {
    /// Create a document with an empty root element.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![MarkupNode::Element(Element::default())],
            root: NodeId(0),
            root_name: root_name.into(),
            declaration: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// The `<?xml ...?>` declaration, verbatim, if the source had one.
    pub fn declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }

    pub fn set_declaration(&mut self, declaration: Option<String>) {
        self.declaration = declaration;
    }

    /// Number of nodes in the arena, including ones no longer reachable.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this document.
    pub fn node(&self, id: NodeId) -> &MarkupNode {
        &self.nodes[id.0]
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id.0) {
            Some(MarkupNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn scalar(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0) {
            Some(MarkupNode::Scalar(s)) => Some(s),
            _ => None,
        }
    }

    /// Scalar value of the field `name` on element `id`, if both exist.
    pub fn field_value(&self, id: NodeId, name: &str) -> Option<&str> {
        let field = self.element(id)?.field(name)?;
        self.scalar(field.node)
    }

    /// Set field `name` on element `id` to a scalar value.
    ///
    /// An existing field with that name keeps its position and takes the new
    /// kind and value, whatever it held before. A new attribute is placed
    /// after the last attribute; a new child ahead of the other children.
    /// Returns `false` if `id` is not an element.
    pub fn set_scalar_field(
        &mut self,
        id: NodeId,
        name: &str,
        kind: FieldKind,
        value: impl Into<String>,
    ) -> bool {
        let value = value.into();
        let existing = match self.element(id) {
            Some(el) => el.position(name).map(|i| (i, el.fields[i].node)),
            None => return false,
        };

        match existing {
            Some((index, node)) => {
                let reuse = matches!(self.nodes.get(node.0), Some(MarkupNode::Scalar(_)));
                let target = if reuse {
                    self.nodes[node.0] = MarkupNode::Scalar(value);
                    node
                } else {
                    self.alloc(MarkupNode::Scalar(value))
                };
                if let Some(MarkupNode::Element(el)) = self.nodes.get_mut(id.0) {
                    el.fields[index].kind = kind;
                    el.fields[index].node = target;
                }
            }
            None => {
                let node = self.alloc(MarkupNode::Scalar(value));
                if let Some(MarkupNode::Element(el)) = self.nodes.get_mut(id.0) {
                    let at = el.insert_position(kind);
                    el.fields.insert(
                        at,
                        Field {
                            name: name.to_string(),
                            kind,
                            node,
                        },
                    );
                }
            }
        }
        true
    }

    /// Remove field `name` from element `id`. Returns whether a field was removed.
    ///
    /// The detached subtree stays in the arena but is no longer reachable.
    pub fn remove_field(&mut self, id: NodeId, name: &str) -> bool {
        match self.nodes.get_mut(id.0) {
            Some(MarkupNode::Element(el)) => match el.position(name) {
                Some(index) => {
                    el.fields.remove(index);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    // -----------------------------------------------------------------------
    // Builder hooks for the parser
    // -----------------------------------------------------------------------

    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
            root_name: String::new(),
            declaration: None,
        }
    }

    pub(crate) fn alloc(&mut self, node: MarkupNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub(crate) fn replace(&mut self, id: NodeId, node: MarkupNode) {
        self.nodes[id.0] = node;
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0) {
            Some(MarkupNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub(crate) fn set_root(&mut self, id: NodeId, name: String) {
        self.root = id;
        self.root_name = name;
    }

    /// Append a parsed field to element `parent`.
    ///
    /// A repeated child name folds into a group at the first occurrence's
    /// position. Returns the name of the conflicting field when a child
    /// element collides with an attribute of the same name.
    pub(crate) fn push_field(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: FieldKind,
        node: NodeId,
    ) -> std::result::Result<(), String> {
        let existing = match self.element(parent) {
            Some(el) => el.field(name).map(|f| (f.kind, f.node)),
            None => return Err(name.to_string()),
        };

        match existing {
            None => {
                if let Some(el) = self.element_mut(parent) {
                    el.fields.push(Field {
                        name: name.to_string(),
                        kind,
                        node,
                    });
                }
                Ok(())
            }
            Some((FieldKind::Child, current)) if kind == FieldKind::Child => {
                if let Some(MarkupNode::Group(members)) = self.nodes.get_mut(current.0) {
                    members.push(node);
                    return Ok(());
                }
                let group = self.alloc(MarkupNode::Group(vec![current, node]));
                if let Some(el) = self.element_mut(parent) {
                    if let Some(field) = el.fields.iter_mut().find(|f| f.name == name) {
                        field.node = group;
                    }
                }
                Ok(())
            }
            Some(_) => Err(name.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_doc() -> (Document, NodeId) {
        let mut doc = Document::new("gpx");
        let root = doc.root();
        let pt = doc.alloc(MarkupNode::Element(Element::default()));
        doc.push_field(root, "trkpt", FieldKind::Child, pt).unwrap();
        assert!(doc.set_scalar_field(pt, "lat", FieldKind::Attribute, "48.1"));
        assert!(doc.set_scalar_field(pt, "lon", FieldKind::Attribute, "11.5"));
        let time = doc.alloc(MarkupNode::Scalar("2024-05-01T10:00:00Z".into()));
        doc.push_field(pt, "time", FieldKind::Child, time).unwrap();
        (doc, pt)
    }

    fn names(doc: &Document, id: NodeId) -> Vec<String> {
        doc.element(id)
            .unwrap()
            .fields()
            .iter()
            .map(|f| f.name.clone())
            .collect()
    }

    #[test]
    fn new_attribute_goes_after_last_attribute() {
        let (mut doc, pt) = point_doc();
        doc.set_scalar_field(pt, "ele", FieldKind::Attribute, "520.3");
        assert_eq!(names(&doc, pt), ["lat", "lon", "ele", "time"]);
    }

    #[test]
    fn new_child_goes_ahead_of_other_children() {
        let (mut doc, pt) = point_doc();
        doc.set_scalar_field(pt, "ele", FieldKind::Child, "520.3");
        assert_eq!(names(&doc, pt), ["lat", "lon", "ele", "time"]);
        assert_eq!(doc.element(pt).unwrap().field("ele").unwrap().kind, FieldKind::Child);
    }

    #[test]
    fn overwrite_keeps_position_and_reuses_node() {
        let (mut doc, pt) = point_doc();
        doc.set_scalar_field(pt, "ele", FieldKind::Child, "1.0");
        let count = doc.node_count();
        doc.set_scalar_field(pt, "ele", FieldKind::Child, "2.0");
        assert_eq!(doc.node_count(), count);
        assert_eq!(doc.field_value(pt, "ele"), Some("2.0"));
        assert_eq!(names(&doc, pt), ["lat", "lon", "ele", "time"]);
    }

    #[test]
    fn overwrite_switches_kind_in_place() {
        let (mut doc, pt) = point_doc();
        doc.set_scalar_field(pt, "ele", FieldKind::Child, "1.0");
        doc.set_scalar_field(pt, "ele", FieldKind::Attribute, "1.0");
        let field = doc.element(pt).unwrap().field("ele").unwrap();
        assert_eq!(field.kind, FieldKind::Attribute);
    }

    #[test]
    fn repeated_children_fold_into_group() {
        let mut doc = Document::new("trkseg");
        let root = doc.root();
        let a = doc.alloc(MarkupNode::Scalar("a".into()));
        let b = doc.alloc(MarkupNode::Scalar("b".into()));
        let c = doc.alloc(MarkupNode::Scalar("c".into()));
        doc.push_field(root, "trkpt", FieldKind::Child, a).unwrap();
        doc.push_field(root, "trkpt", FieldKind::Child, b).unwrap();
        doc.push_field(root, "trkpt", FieldKind::Child, c).unwrap();

        let field = doc.element(root).unwrap().field("trkpt").unwrap();
        assert_eq!(doc.node(field.node), &MarkupNode::Group(vec![a, b, c]));
    }

    #[test]
    fn child_colliding_with_attribute_is_rejected() {
        let (mut doc, pt) = point_doc();
        let lat = doc.alloc(MarkupNode::Scalar("1".into()));
        assert_eq!(doc.push_field(pt, "lat", FieldKind::Child, lat), Err("lat".to_string()));
    }

    #[test]
    fn remove_field_reports_presence() {
        let (mut doc, pt) = point_doc();
        assert!(doc.remove_field(pt, "time"));
        assert!(!doc.remove_field(pt, "time"));
        assert_eq!(names(&doc, pt), ["lat", "lon"]);
    }

    #[test]
    fn set_on_scalar_node_is_refused() {
        let (mut doc, pt) = point_doc();
        let lat = doc.element(pt).unwrap().field("lat").unwrap().node;
        assert!(!doc.set_scalar_field(lat, "x", FieldKind::Attribute, "1"));
    }
}
