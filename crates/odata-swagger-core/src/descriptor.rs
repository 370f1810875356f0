//! Structural type descriptors.
//!
//! A [`TypeDescriptor`] answers the questions document generation needs about
//! a type (is it a collection, an enum, nullable, which members does it have)
//! without runtime reflection. Metadata models built from static language
//! types provide these descriptors through an adapter; route-table files
//! spell them out directly:
//!
//! ```yaml
//! name: Supplier
//! namespace: Sample.Models
//! kind: composite
//! members:
//!   - name: Id
//!     type: { kind: primitive, primitive: int64 }
//!   - name: Description
//!     alias: Something
//!     type: { kind: primitive, primitive: string }
//! ```

use serde::{Deserialize, Serialize};

/// Generic definition name of the single-argument enumerable interface.
///
/// A type is a collection when it (or one of its interfaces) is a
/// [`TypeKind::Generic`] with this definition and exactly one argument.
pub const ENUMERABLE: &str = "IEnumerable";

/// Namespace used for the built-in primitive and wrapper types.
pub const SYSTEM_NAMESPACE: &str = "System";

const COLLECTIONS_NAMESPACE: &str = "System.Collections.Generic";

/// Opaque handle to a structural type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Simple type name (e.g., `Supplier`, `Int32`, `List<Supplier>`).
    pub name: String,

    /// Dotted namespace (e.g., `Sample.Models`), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Structural shape of the type.
    #[serde(flatten)]
    pub kind: TypeKind,

    /// Implemented interfaces, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<TypeDescriptor>,

    /// Whether the type is publicly visible to type scans.
    #[serde(default = "default_visible", skip_serializing_if = "is_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde `skip_serializing_if` signature
fn is_visible(visible: &bool) -> bool {
    *visible
}

/// Structural shape of a [`TypeDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    /// A recognized primitive or well-known value type.
    Primitive {
        /// Which primitive.
        primitive: Primitive,
    },

    /// An enumeration; `members` are the member names in declaration order.
    Enum {
        /// Member names in declaration order.
        members: Vec<String>,
    },

    /// Nullable wrapper around a value type.
    Nullable {
        /// The wrapped type.
        inner: Box<TypeDescriptor>,
    },

    /// Array of `element`.
    Array {
        /// Array element type.
        element: Box<TypeDescriptor>,
    },

    /// Instantiated generic type (e.g., `IEnumerable<T>`, `List<T>`, `Task<T>`).
    Generic {
        /// Generic definition name without arity (e.g., `List`).
        definition: String,
        /// Type arguments in order.
        arguments: Vec<TypeDescriptor>,
    },

    /// Named record type with members; described once in the definitions table.
    Composite {
        /// Members in declaration order.
        members: Vec<MemberDescriptor>,
    },

    /// Anonymous record type; always described inline.
    Inline {
        /// Members in declaration order.
        members: Vec<MemberDescriptor>,
    },

    /// Named type resolved by full name against the loaded types.
    ///
    /// Lets record graphs refer back to themselves without infinite nesting.
    Reference {
        /// Fully-qualified name of the referenced type.
        full_name: String,
    },
}

/// Primitive and well-known value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum Primitive {
    Boolean,
    Byte,
    #[serde(rename = "sbyte")]
    SByte,
    Int16,
    Int32,
    Int64,
    Single,
    Double,
    Decimal,
    String,
    Char,
    DateTime,
    DateTimeOffset,
    Date,
    TimeOfDay,
    TimeSpan,
    Guid,
    Uri,
    Binary,
}

impl Primitive {
    /// Simple type name in the system namespace (e.g., `Int32`).
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::SByte => "SByte",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Single => "Single",
            Self::Double => "Double",
            Self::Decimal => "Decimal",
            Self::String => "String",
            Self::Char => "Char",
            Self::DateTime => "DateTime",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Date => "Date",
            Self::TimeOfDay => "TimeOfDay",
            Self::TimeSpan => "TimeSpan",
            Self::Guid => "Guid",
            Self::Uri => "Uri",
            Self::Binary => "Byte[]",
        }
    }

    /// Well-known value types that are not language primitives
    /// (date/time, decimal, guid, uri, time-span).
    #[must_use]
    pub fn is_well_known_value_type(self) -> bool {
        matches!(
            self,
            Self::Decimal
                | Self::DateTime
                | Self::DateTimeOffset
                | Self::Date
                | Self::TimeOfDay
                | Self::TimeSpan
                | Self::Guid
                | Self::Uri
        )
    }
}

/// A named member of a composite type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDescriptor {
    /// Declared identifier.
    pub name: String,

    /// Member type.
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,

    /// Explicit serialization alias, preferred by the default naming policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Declared optional (never listed as required).
    #[serde(default)]
    pub optional: bool,

    /// Navigation property to a related entity.
    #[serde(default)]
    pub navigation: bool,
}

impl MemberDescriptor {
    /// Required, non-navigation member.
    #[must_use]
    pub fn new(name: &str, ty: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            ty,
            alias: None,
            optional: false,
            navigation: false,
        }
    }

    /// Set the serialization alias.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Mark as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark as a navigation property.
    #[must_use]
    pub fn navigation(mut self) -> Self {
        self.navigation = true;
        self
    }
}

impl TypeDescriptor {
    fn system(name: &str, namespace: &str, kind: TypeKind) -> Self {
        Self {
            name: name.to_string(),
            namespace: Some(namespace.to_string()),
            kind,
            interfaces: Vec::new(),
            visible: true,
        }
    }

    /// Primitive type. Strings additionally implement `IEnumerable<Char>`.
    #[must_use]
    pub fn primitive(primitive: Primitive) -> Self {
        let ty = Self::system(
            primitive.type_name(),
            SYSTEM_NAMESPACE,
            TypeKind::Primitive { primitive },
        );
        if primitive == Primitive::String {
            ty.with_interface(Self::enumerable(Self::primitive(Primitive::Char)))
        } else {
            ty
        }
    }

    /// Shorthand for `primitive(Primitive::String)`.
    #[must_use]
    pub fn string() -> Self {
        Self::primitive(Primitive::String)
    }

    /// Shorthand for `primitive(Primitive::Int32)`.
    #[must_use]
    pub fn int32() -> Self {
        Self::primitive(Primitive::Int32)
    }

    /// Shorthand for `primitive(Primitive::Int64)`.
    #[must_use]
    pub fn int64() -> Self {
        Self::primitive(Primitive::Int64)
    }

    /// Enumeration named by `full_name` with the given member names.
    #[must_use]
    pub fn enumeration(full_name: &str, members: &[&str]) -> Self {
        Self::named(
            full_name,
            TypeKind::Enum {
                members: members.iter().map(ToString::to_string).collect(),
            },
        )
    }

    /// `Nullable<inner>`. Wrapping an already nullable type returns it unchanged.
    #[must_use]
    pub fn nullable(inner: Self) -> Self {
        if matches!(inner.kind, TypeKind::Nullable { .. }) {
            return inner;
        }
        Self::system(
            "Nullable",
            SYSTEM_NAMESPACE,
            TypeKind::Nullable {
                inner: Box::new(inner),
            },
        )
    }

    /// `element[]`.
    #[must_use]
    pub fn array(element: Self) -> Self {
        let name = format!("{}[]", element.name);
        Self {
            name,
            namespace: element.namespace.clone(),
            kind: TypeKind::Array {
                element: Box::new(element),
            },
            interfaces: Vec::new(),
            visible: true,
        }
    }

    /// Instantiated generic type without interfaces.
    #[must_use]
    pub fn generic(full_name: &str, arguments: Vec<Self>) -> Self {
        let (namespace, definition) = split_full_name(full_name);
        let args: Vec<&str> = arguments.iter().map(|a| a.name.as_str()).collect();
        Self {
            name: format!("{definition}<{}>", args.join(",")),
            namespace,
            kind: TypeKind::Generic {
                definition: definition.to_string(),
                arguments,
            },
            interfaces: Vec::new(),
            visible: true,
        }
    }

    /// `IEnumerable<element>`.
    #[must_use]
    pub fn enumerable(element: Self) -> Self {
        Self::generic(&format!("{COLLECTIONS_NAMESPACE}.{ENUMERABLE}"), vec![element])
    }

    /// `List<element>`, implementing `IEnumerable<element>`.
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::generic(
            &format!("{COLLECTIONS_NAMESPACE}.List"),
            vec![element.clone()],
        )
        .with_interface(Self::enumerable(element))
    }

    /// Named record type.
    #[must_use]
    pub fn composite(full_name: &str, members: Vec<MemberDescriptor>) -> Self {
        Self::named(full_name, TypeKind::Composite { members })
    }

    /// Anonymous record type described inline.
    #[must_use]
    pub fn inline(members: Vec<MemberDescriptor>) -> Self {
        Self {
            name: String::new(),
            namespace: None,
            kind: TypeKind::Inline { members },
            interfaces: Vec::new(),
            visible: true,
        }
    }

    /// Reference to a named type, resolved against the loaded types.
    #[must_use]
    pub fn reference(full_name: &str) -> Self {
        Self::named(
            full_name,
            TypeKind::Reference {
                full_name: full_name.to_string(),
            },
        )
    }

    fn named(full_name: &str, kind: TypeKind) -> Self {
        let (namespace, name) = split_full_name(full_name);
        Self {
            name: name.to_string(),
            namespace,
            kind,
            interfaces: Vec::new(),
            visible: true,
        }
    }

    /// Append an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: Self) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Hide the type from type scans.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Fully-qualified name: `namespace.name`, or `name` without a namespace.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Members of a composite or inline record; empty for every other kind.
    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        match &self.kind {
            TypeKind::Composite { members } | TypeKind::Inline { members } => members,
            _ => &[],
        }
    }

    /// Look up a member by declared name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members().iter().find(|m| m.name == name)
    }

    /// The primitive kind, if this is a primitive type.
    #[must_use]
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self.kind {
            TypeKind::Primitive { primitive } => Some(primitive),
            _ => None,
        }
    }
}

/// Split `Ns.Sub.Name` into `(Some("Ns.Sub"), "Name")`.
fn split_full_name(full_name: &str) -> (Option<String>, &str) {
    match full_name.rsplit_once('.') {
        Some((ns, name)) => (Some(ns.to_string()), name),
        None => (None, full_name),
    }
}
