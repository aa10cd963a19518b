//! Static type descriptors for bindable targets.
//!
//! A [`TypeDescriptor`] tells the binder how to rebuild a value from flat
//! parameters: which scalar conversion to use, which enum constants exist,
//! or which fields a composite carries.

use std::fmt;

/// Scalar targets with a built-in or registered conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Str,
    /// Application type converted by a registered converter; zero value is null.
    Custom(String),
}

impl ScalarType {
    pub fn name(&self) -> &str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Byte => "i8",
            ScalarType::Short => "i16",
            ScalarType::Int => "i32",
            ScalarType::Long => "i64",
            ScalarType::Float => "f32",
            ScalarType::Double => "f64",
            ScalarType::Char => "char",
            ScalarType::Str => "String",
            ScalarType::Custom(name) => name,
        }
    }
}

/// Dates and arbitrary-precision numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalType {
    /// Date accepted in the four legacy formats
    Date,
    /// ISO-8601 calendar date
    LocalDate,
    /// ISO-8601 date and time
    LocalDateTime,
    /// Decimal with up to 28 significant digits
    BigDecimal,
    /// Integer within `i128`; wider input fails to convert and binds null
    BigInteger,
}

/// A named field of a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Ordered fields of a composite, inherited fields included.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDescriptor {
    pub fields: Vec<FieldDescriptor>,
    /// False for abstract types or types with no zero-argument constructor
    pub instantiable: bool,
}

/// Classification of a bindable type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Scalar(ScalarType),
    Enum(Vec<String>),
    Temporal(TemporalType),
    Composite(CompositeDescriptor),
    Array(Box<TypeDescriptor>),
    Collection(Box<TypeDescriptor>),
}

/// Static description of a bindable target type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
}

impl TypeDescriptor {
    pub fn scalar(scalar: ScalarType) -> Self {
        Self {
            name: scalar.name().to_string(),
            kind: TypeKind::Scalar(scalar),
        }
    }

    pub fn string() -> Self {
        Self::scalar(ScalarType::Str)
    }

    /// A custom scalar converted through the conversion table
    pub fn custom(name: impl Into<String>) -> Self {
        Self::scalar(ScalarType::Custom(name.into()))
    }

    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: TypeKind::Enum(constants.into_iter().map(Into::into).collect()),
        }
    }

    pub fn temporal(temporal: TemporalType) -> Self {
        let name = match temporal {
            TemporalType::Date => "Date",
            TemporalType::LocalDate => "LocalDate",
            TemporalType::LocalDateTime => "LocalDateTime",
            TemporalType::BigDecimal => "BigDecimal",
            TemporalType::BigInteger => "BigInteger",
        };
        Self {
            name: name.to_string(),
            kind: TypeKind::Temporal(temporal),
        }
    }

    /// Start an instantiable composite with no fields.
    pub fn composite(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Composite(CompositeDescriptor {
                fields: Vec::new(),
                instantiable: true,
            }),
        }
    }

    /// A composite that can never be instantiated; binds to null.
    pub fn abstract_composite(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Composite(CompositeDescriptor {
                fields: Vec::new(),
                instantiable: false,
            }),
        }
    }

    pub fn array_of(element: TypeDescriptor) -> Self {
        Self {
            name: format!("{}[]", element.name),
            kind: TypeKind::Array(Box::new(element)),
        }
    }

    pub fn collection_of(element: TypeDescriptor) -> Self {
        Self {
            name: format!("List<{}>", element.name),
            kind: TypeKind::Collection(Box::new(element)),
        }
    }

    /// Add a field to a composite. No effect on other kinds.
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        if let TypeKind::Composite(composite) = &mut self.kind {
            composite.fields.push(FieldDescriptor {
                name: name.into(),
                ty,
            });
        }
        self
    }

    /// Append the parent's fields after this composite's own fields.
    pub fn extends(mut self, parent: &TypeDescriptor) -> Self {
        if let (TypeKind::Composite(composite), TypeKind::Composite(base)) =
            (&mut self.kind, &parent.kind)
        {
            composite.fields.extend(base.fields.iter().cloned());
        }
        self
    }

    pub fn is_scalar_like(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Scalar(_) | TypeKind::Enum(_) | TypeKind::Temporal(_)
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, TypeKind::Array(_) | TypeKind::Collection(_))
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Composite(composite) => &composite.fields,
            _ => &[],
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
