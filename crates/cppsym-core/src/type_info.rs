//! Type descriptors.
//!
//! A [`TypeInfo`] describes the type a declaration refers to: its basic
//! [`TypeKind`], qualifier and storage [`TypeFlags`], the chain of
//! pointer/reference/array operators applied to it, and optionally the
//! symbol that names a user-defined type.
//!
//! ## Operator order
//!
//! `ptr_ops[0]` is the operator closest to the declarator name. For
//! `const int * volatile * p`:
//!
//! ```text
//! flags   = CONST                 (qualifies the base `int`)
//! ptr_ops = [Pointer, Pointer{volatile}]
//! ```
//!
//! A reference is therefore always at index 0.

use std::fmt;

use bitflags::bitflags;

use crate::SymbolId;

// ============================================================================
// TypeKind
// ============================================================================

/// The basic kind of a type or declaration.
///
/// Variants are ordered so that contiguous groups can be tested with
/// [`TypeKind::is_between`]: the class-like kinds `Class..=Union`, the
/// arithmetic kinds `CBool..=Double`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum TypeKind {
    #[default]
    Undef,
    /// A reference to another type through `type_symbol` (typedefs, class-typed objects).
    Type,
    Namespace,
    Class,
    Struct,
    Union,
    Enumeration,
    Constructor,
    Function,
    /// C99 `_Bool`.
    CBool,
    Bool,
    Char,
    WChar,
    Int,
    Float,
    Double,
    Void,
    Enumerator,
    Block,
    Template,
    Asm,
    Linkage,
    TemplateParameter,
    /// A dependent type name (`typename T::x`), also the kind of a type template parameter.
    TypeName,
}

impl TypeKind {
    /// Whether `self` lies within the inclusive range `lo..=hi`.
    #[inline]
    pub fn is_between(self, lo: TypeKind, hi: TypeKind) -> bool {
        lo <= self && self <= hi
    }

    /// Class, struct or union.
    #[inline]
    pub fn is_class_like(self) -> bool {
        self.is_between(TypeKind::Class, TypeKind::Union)
    }

    /// Kinds whose declarations may be hidden by an object or function of the same name.
    #[inline]
    pub fn is_elaborated(self) -> bool {
        self.is_between(TypeKind::Class, TypeKind::Enumeration)
    }

    /// Built-in arithmetic kinds, `_Bool` through `double`.
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        self.is_between(TypeKind::CBool, TypeKind::Double)
    }

    #[inline]
    pub fn is_function_like(self) -> bool {
        matches!(self, TypeKind::Function | TypeKind::Constructor)
    }

    /// The source keyword for built-in kinds, empty for everything else.
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::CBool => "_Bool",
            TypeKind::Bool => "bool",
            TypeKind::Char => "char",
            TypeKind::WChar => "wchar_t",
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Double => "double",
            TypeKind::Void => "void",
            TypeKind::Class => "class",
            TypeKind::Struct => "struct",
            TypeKind::Union => "union",
            TypeKind::Enumeration => "enum",
            TypeKind::Namespace => "namespace",
            TypeKind::TypeName => "typename",
            TypeKind::Template => "template",
            _ => "",
        }
    }
}

// ============================================================================
// TypeFlags
// ============================================================================

bitflags! {
    /// Storage classes, specifiers and qualifiers of a declaration.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeFlags: u32 {
        const AUTO      = 1 << 0;
        const REGISTER  = 1 << 1;
        const STATIC    = 1 << 2;
        const EXTERN    = 1 << 3;
        const MUTABLE   = 1 << 4;
        const INLINE    = 1 << 5;
        const VIRTUAL   = 1 << 6;
        const EXPLICIT  = 1 << 7;
        const TYPEDEF   = 1 << 8;
        const FRIEND    = 1 << 9;
        const CONST     = 1 << 10;
        const VOLATILE  = 1 << 11;
        const UNSIGNED  = 1 << 12;
        const SHORT     = 1 << 13;
        const LONG      = 1 << 14;
        const COMPLEX   = 1 << 15;
        const IMAGINARY = 1 << 16;
        const LONG_LONG = 1 << 17;
        const SIGNED    = 1 << 18;
    }
}

impl TypeFlags {
    /// `const` and `volatile`.
    pub const CV: TypeFlags = TypeFlags::CONST.union(TypeFlags::VOLATILE);

    /// Flags that distinguish one type from another. Storage classes and
    /// function specifiers are not part of a type.
    pub const TYPE_RELEVANT: TypeFlags = TypeFlags::CV
        .union(TypeFlags::UNSIGNED)
        .union(TypeFlags::SHORT)
        .union(TypeFlags::LONG)
        .union(TypeFlags::LONG_LONG)
        .union(TypeFlags::SIGNED)
        .union(TypeFlags::COMPLEX)
        .union(TypeFlags::IMAGINARY);

    /// Size and sign modifiers of an integral type.
    pub const INTEGRAL_MODIFIERS: TypeFlags = TypeFlags::SHORT
        .union(TypeFlags::LONG)
        .union(TypeFlags::LONG_LONG)
        .union(TypeFlags::UNSIGNED);
}

// ============================================================================
// Pointer operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PtrOpKind {
    /// Carries cv-qualification only. Produced when a reference to a
    /// cv-qualified type is stripped for comparison.
    #[default]
    Undef,
    Pointer,
    Reference,
    Array,
    MemberPointer,
}

/// One pointer, reference, array or pointer-to-member operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PtrOp {
    pub kind: PtrOpKind,
    pub is_const: bool,
    pub is_volatile: bool,
    /// The class of a pointer-to-member.
    pub member_of: Option<SymbolId>,
}

impl PtrOp {
    pub const fn new(kind: PtrOpKind) -> Self {
        Self {
            kind,
            is_const: false,
            is_volatile: false,
            member_of: None,
        }
    }

    pub const fn pointer() -> Self {
        Self::new(PtrOpKind::Pointer)
    }

    pub const fn reference() -> Self {
        Self::new(PtrOpKind::Reference)
    }

    pub const fn array() -> Self {
        Self::new(PtrOpKind::Array)
    }

    pub const fn member_pointer(class: SymbolId) -> Self {
        Self {
            kind: PtrOpKind::MemberPointer,
            is_const: false,
            is_volatile: false,
            member_of: Some(class),
        }
    }

    /// A cv-only operator.
    pub const fn cv(is_const: bool, is_volatile: bool) -> Self {
        Self {
            kind: PtrOpKind::Undef,
            is_const,
            is_volatile,
            member_of: None,
        }
    }

    #[must_use]
    pub const fn with_const(mut self) -> Self {
        self.is_const = true;
        self
    }

    #[must_use]
    pub const fn with_volatile(mut self) -> Self {
        self.is_volatile = true;
        self
    }

    #[inline]
    pub fn has_cv(&self) -> bool {
        self.is_const || self.is_volatile
    }

    /// Whether this operator's qualifiers are all present on `other`.
    #[inline]
    pub fn cv_subset_of(&self, other: &PtrOp) -> bool {
        (!self.is_const || other.is_const) && (!self.is_volatile || other.is_volatile)
    }

    /// Partial order of cv-qualification: `Less` means strictly fewer
    /// qualifiers, `None` means neither set contains the other.
    pub fn compare_cv(&self, other: &PtrOp) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering;
        match (self.cv_subset_of(other), other.cv_subset_of(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => None,
        }
    }

    pub fn cv_flags(&self) -> TypeFlags {
        let mut flags = TypeFlags::empty();
        flags.set(TypeFlags::CONST, self.is_const);
        flags.set(TypeFlags::VOLATILE, self.is_volatile);
        flags
    }
}

/// A unary operator applied to an argument expression before it is matched
/// against a parameter, e.g. `f(&x)` or `f(*p)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorExpression {
    AddressOf,
    Indirection,
    Subscript,
}

// ============================================================================
// TypeInfo
// ============================================================================

/// Describes a referenced type.
///
/// Equality and hashing are structural. Semantic type identity (typedef
/// collapsing, template parameter equivalence) lives in the semantics crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TypeInfo {
    pub kind: TypeKind,
    pub flags: TypeFlags,
    /// The named type for `Type`, class-like and template-parameter kinds.
    pub type_symbol: Option<SymbolId>,
    pub ptr_ops: Vec<PtrOp>,
    /// Textual value of a literal (template arguments such as `5`, `"abc"`).
    pub literal: Option<String>,
    /// Default argument or default template argument.
    pub default: Option<Box<TypeInfo>>,
    pub has_default: bool,
    /// For template parameters: `TypeName` for type parameters, the value
    /// type for non-type parameters, `Template` for template template parameters.
    pub template_param_kind: Option<TypeKind>,
    pub operator_exprs: Vec<OperatorExpression>,
}

impl TypeInfo {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// A `Type` descriptor naming `symbol`.
    pub fn of_symbol(symbol: SymbolId) -> Self {
        Self::new(TypeKind::Type).with_symbol(symbol)
    }

    #[must_use]
    pub fn with_symbol(mut self, symbol: SymbolId) -> Self {
        self.type_symbol = Some(symbol);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: TypeFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[must_use]
    pub fn with_ptr(mut self, op: PtrOp) -> Self {
        self.ptr_ops.push(op);
        self
    }

    #[must_use]
    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: TypeInfo) -> Self {
        self.default = Some(Box::new(default));
        self.has_default = true;
        self
    }

    /// Marks a function parameter as having a default argument whose value is not tracked.
    #[must_use]
    pub fn with_has_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    #[must_use]
    pub fn with_operator(mut self, op: OperatorExpression) -> Self {
        self.operator_exprs.push(op);
        self
    }

    #[must_use]
    pub fn with_template_param_kind(mut self, kind: TypeKind) -> Self {
        self.template_param_kind = Some(kind);
        self
    }

    #[inline]
    pub fn is(&self, kind: TypeKind) -> bool {
        self.kind == kind
    }

    #[inline]
    pub fn has_flag(&self, flag: TypeFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.flags.contains(TypeFlags::CONST)
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.flags.contains(TypeFlags::STATIC)
    }

    #[inline]
    pub fn has_ptr_ops(&self) -> bool {
        !self.ptr_ops.is_empty()
    }

    #[inline]
    pub fn is_reference(&self) -> bool {
        matches!(self.ptr_ops.first(), Some(op) if op.kind == PtrOpKind::Reference)
    }

    /// Base-level cv flags.
    #[inline]
    pub fn cv_flags(&self) -> TypeFlags {
        self.flags & TypeFlags::CV
    }

    #[inline]
    pub fn relevant_flags(&self) -> TypeFlags {
        self.flags & TypeFlags::TYPE_RELEVANT
    }

    /// Whether this is exactly `void` with no operators, as in `f(void)`.
    pub fn is_plain_void(&self) -> bool {
        self.kind == TypeKind::Void && self.ptr_ops.is_empty()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flags.contains(TypeFlags::CONST) {
            f.write_str("const ")?;
        }
        if self.flags.contains(TypeFlags::UNSIGNED) {
            f.write_str("unsigned ")?;
        }
        if self.flags.contains(TypeFlags::SHORT) {
            f.write_str("short ")?;
        }
        if self.flags.contains(TypeFlags::LONG_LONG) {
            f.write_str("long long ")?;
        } else if self.flags.contains(TypeFlags::LONG) {
            f.write_str("long ")?;
        }
        match (self.kind.keyword(), self.type_symbol) {
            ("", Some(id)) => write!(f, "{}", id)?,
            ("", None) => write!(f, "{:?}", self.kind)?,
            (kw, _) => f.write_str(kw)?,
        }
        for op in self.ptr_ops.iter().rev() {
            match op.kind {
                PtrOpKind::Pointer | PtrOpKind::MemberPointer => f.write_str("*")?,
                PtrOpKind::Reference => f.write_str("&")?,
                PtrOpKind::Array => f.write_str("[]")?,
                PtrOpKind::Undef => {}
            }
            if op.is_const {
                f.write_str(" const")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn kind_ranges() {
        assert!(TypeKind::Struct.is_class_like());
        assert!(!TypeKind::Enumeration.is_class_like());
        assert!(TypeKind::Enumeration.is_elaborated());
        assert!(TypeKind::Char.is_arithmetic());
        assert!(!TypeKind::Void.is_arithmetic());
        assert!(TypeKind::Int.is_between(TypeKind::Bool, TypeKind::Int));
    }

    #[test]
    fn relevant_flags_ignore_storage() {
        let a = TypeInfo::new(TypeKind::Int).with_flags(TypeFlags::STATIC | TypeFlags::CONST);
        assert_eq!(a.relevant_flags(), TypeFlags::CONST);
    }

    #[test]
    fn cv_ordering() {
        let plain = PtrOp::pointer();
        let c = PtrOp::pointer().with_const();
        let v = PtrOp::pointer().with_volatile();
        assert_eq!(plain.compare_cv(&c), Some(Ordering::Less));
        assert_eq!(c.compare_cv(&plain), Some(Ordering::Greater));
        assert_eq!(c.compare_cv(&v), None);
        assert_eq!(c.compare_cv(&c), Some(Ordering::Equal));
    }

    #[test]
    fn reference_detection() {
        let r = TypeInfo::new(TypeKind::Int).with_ptr(PtrOp::reference());
        assert!(r.is_reference());
        assert!(!TypeInfo::new(TypeKind::Int).is_reference());
    }

    #[test]
    fn display_builtin() {
        let t = TypeInfo::new(TypeKind::Char)
            .with_flags(TypeFlags::CONST)
            .with_ptr(PtrOp::pointer());
        assert_eq!(t.to_string(), "const char*");
    }

    #[test]
    fn default_marks_has_default() {
        let t = TypeInfo::new(TypeKind::Int).with_default(TypeInfo::new(TypeKind::Int).with_literal("0"));
        assert!(t.has_default);
        assert_eq!(t.default.as_ref().and_then(|d| d.literal.as_deref()), Some("0"));
    }
}
