//! Template tree produced by the parser.

/// A node of a SQL template.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Literal SQL text, possibly containing `#prop#` and `$prop$` markers.
    Text(String),
    /// One of the `is*` predicate tags.
    Conditional(Conditional),
    /// `<iterate>` over a collection property.
    Iterate(Iterate),
    /// `<dynamic>` block.
    Dynamic(Dynamic),
    /// `<include refid="..."/>` reference to a SQL fragment.
    Include(Include),
}

impl SqlNode {
    /// Create a text node.
    pub fn text(text: impl Into<String>) -> Self {
        SqlNode::Text(text.into())
    }

    /// Whether this node or any descendant is a tag whose output depends on
    /// the parameter object.
    pub fn has_tags(&self) -> bool {
        match self {
            SqlNode::Text(_) => false,
            SqlNode::Include(_) => false,
            SqlNode::Conditional(_) | SqlNode::Iterate(_) | SqlNode::Dynamic(_) => true,
        }
    }

    /// Child nodes, empty for text and includes.
    pub fn children(&self) -> &[SqlNode] {
        match self {
            SqlNode::Text(_) | SqlNode::Include(_) => &[],
            SqlNode::Conditional(c) => &c.children,
            SqlNode::Iterate(i) => &i.children,
            SqlNode::Dynamic(d) => &d.children,
        }
    }

    /// Mutable child nodes, empty for text and includes.
    pub fn children_mut(&mut self) -> Option<&mut Vec<SqlNode>> {
        match self {
            SqlNode::Text(_) | SqlNode::Include(_) => None,
            SqlNode::Conditional(c) => Some(&mut c.children),
            SqlNode::Iterate(i) => Some(&mut i.children),
            SqlNode::Dynamic(d) => Some(&mut d.children),
        }
    }
}

impl From<Conditional> for SqlNode {
    fn from(c: Conditional) -> Self {
        SqlNode::Conditional(c)
    }
}

impl From<Iterate> for SqlNode {
    fn from(i: Iterate) -> Self {
        SqlNode::Iterate(i)
    }
}

impl From<Dynamic> for SqlNode {
    fn from(d: Dynamic) -> Self {
        SqlNode::Dynamic(d)
    }
}

impl From<Include> for SqlNode {
    fn from(i: Include) -> Self {
        SqlNode::Include(i)
    }
}

/// Predicate evaluated by a conditional tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    IsEqual,
    IsNotEqual,
    IsGreaterThan,
    IsGreaterEqual,
    IsLessThan,
    IsLessEqual,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsPropertyAvailable,
    IsNotPropertyAvailable,
    IsParameterPresent,
    IsNotParameterPresent,
}

impl ConditionKind {
    /// All conditional kinds.
    pub const ALL: [ConditionKind; 14] = [
        ConditionKind::IsEqual,
        ConditionKind::IsNotEqual,
        ConditionKind::IsGreaterThan,
        ConditionKind::IsGreaterEqual,
        ConditionKind::IsLessThan,
        ConditionKind::IsLessEqual,
        ConditionKind::IsNull,
        ConditionKind::IsNotNull,
        ConditionKind::IsEmpty,
        ConditionKind::IsNotEmpty,
        ConditionKind::IsPropertyAvailable,
        ConditionKind::IsNotPropertyAvailable,
        ConditionKind::IsParameterPresent,
        ConditionKind::IsNotParameterPresent,
    ];

    /// The tag name used in templates.
    pub fn tag_name(self) -> &'static str {
        match self {
            ConditionKind::IsEqual => "isEqual",
            ConditionKind::IsNotEqual => "isNotEqual",
            ConditionKind::IsGreaterThan => "isGreaterThan",
            ConditionKind::IsGreaterEqual => "isGreaterEqual",
            ConditionKind::IsLessThan => "isLessThan",
            ConditionKind::IsLessEqual => "isLessEqual",
            ConditionKind::IsNull => "isNull",
            ConditionKind::IsNotNull => "isNotNull",
            ConditionKind::IsEmpty => "isEmpty",
            ConditionKind::IsNotEmpty => "isNotEmpty",
            ConditionKind::IsPropertyAvailable => "isPropertyAvailable",
            ConditionKind::IsNotPropertyAvailable => "isNotPropertyAvailable",
            ConditionKind::IsParameterPresent => "isParameterPresent",
            ConditionKind::IsNotParameterPresent => "isNotParameterPresent",
        }
    }

    /// Look up a kind by tag name.
    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag_name() == name)
    }

    /// Comparison tags need `compareValue` or `compareProperty`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            ConditionKind::IsEqual
                | ConditionKind::IsNotEqual
                | ConditionKind::IsGreaterThan
                | ConditionKind::IsGreaterEqual
                | ConditionKind::IsLessThan
                | ConditionKind::IsLessEqual
        )
    }

    /// Parameter-presence tags test the parameter object itself.
    pub fn tests_parameter(self) -> bool {
        matches!(
            self,
            ConditionKind::IsParameterPresent | ConditionKind::IsNotParameterPresent
        )
    }
}

/// What a comparison tag compares the property against.
#[derive(Debug, Clone, PartialEq)]
pub enum CompareTarget {
    /// A literal from `compareValue`.
    Value(String),
    /// Another property from `compareProperty`.
    Property(String),
}

/// A conditional tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub kind: ConditionKind,
    pub prepend: Option<String>,
    /// Property path tested. `None` tests the parameter object itself.
    pub property: Option<String>,
    pub compare: Option<CompareTarget>,
    pub children: Vec<SqlNode>,
}

impl Conditional {
    /// Create a conditional tag testing `property`.
    pub fn new(kind: ConditionKind, property: impl Into<String>) -> Self {
        Self {
            kind,
            prepend: None,
            property: Some(property.into()),
            compare: None,
            children: Vec::new(),
        }
    }

    /// Create a parameter-presence tag.
    pub fn parameter(kind: ConditionKind) -> Self {
        Self {
            kind,
            prepend: None,
            property: None,
            compare: None,
            children: Vec::new(),
        }
    }

    pub fn prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = Some(prepend.into());
        self
    }

    pub fn compare_value(mut self, value: impl Into<String>) -> Self {
        self.compare = Some(CompareTarget::Value(value.into()));
        self
    }

    pub fn compare_property(mut self, property: impl Into<String>) -> Self {
        self.compare = Some(CompareTarget::Property(property.into()));
        self
    }

    pub fn child(mut self, node: impl Into<SqlNode>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// An `<iterate>` tag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Iterate {
    pub prepend: Option<String>,
    /// Collection property. `None` iterates the parameter object itself.
    pub property: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub conjunction: Option<String>,
    pub children: Vec<SqlNode>,
}

impl Iterate {
    /// Create an iterate tag over `property`.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            ..Default::default()
        }
    }

    pub fn prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = Some(prepend.into());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = Some(close.into());
        self
    }

    pub fn conjunction(mut self, conjunction: impl Into<String>) -> Self {
        self.conjunction = Some(conjunction.into());
        self
    }

    pub fn child(mut self, node: impl Into<SqlNode>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// A `<dynamic>` block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dynamic {
    pub prepend: Option<String>,
    pub children: Vec<SqlNode>,
}

impl Dynamic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(mut self, prepend: impl Into<String>) -> Self {
        self.prepend = Some(prepend.into());
        self
    }

    pub fn child(mut self, node: impl Into<SqlNode>) -> Self {
        self.children.push(node.into());
        self
    }
}

/// An `<include>` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub refid: String,
}

impl Include {
    pub fn new(refid: impl Into<String>) -> Self {
        Self {
            refid: refid.into(),
        }
    }
}
