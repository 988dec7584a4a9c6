use std::fmt::Display;

use bitflags::bitflags;

use crate::token::TokenType;

/// Display name carried by the descriptor of `nil`.
pub const NULL_TYPE_NAME: &str = "null";
const ARRAY_SUFFIX: &str = "[]";

bitflags! {
    /// Qualifiers attached to a variable, field, method or parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierSet: u8 {
        const CONST = 1 << 0;
        const STATIC = 1 << 1;
        const OPERATOR = 1 << 2;
        const CAST = 1 << 3;
        const UNSIGNED = 1 << 4;
        const BYTE = 1 << 5;
    }
}

impl ModifierSet {
    pub fn from_token_type(token_type: TokenType) -> Option<Self> {
        match token_type {
            TokenType::Const => Some(Self::CONST),
            TokenType::Static => Some(Self::STATIC),
            TokenType::Operator => Some(Self::OPERATOR),
            TokenType::Cast => Some(Self::CAST),
            TokenType::Unsigned => Some(Self::UNSIGNED),
            _ => None,
        }
    }

    pub fn is_const(&self) -> bool {
        self.contains(Self::CONST)
    }

    pub fn is_static(&self) -> bool {
        self.contains(Self::STATIC)
    }

    /// The modifiers that take part in signature comparisons. `byte` and
    /// `unsigned` describe value ranges, not the shape of a declaration.
    pub fn signature(&self) -> Self {
        *self & (Self::CONST | Self::STATIC | Self::OPERATOR | Self::CAST)
    }
}

impl Display for ModifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }

        let names: Vec<String> = self.iter_names().map(|(name, _)| name.to_lowercase()).collect();
        write!(f, "{}", names.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    String,
    Number,
    Boolean,
    Void,
    TypeValue,
    Any,
}

/// The shape of a value: a kind plus a display name. Object descriptors are
/// nominal, array descriptors carry one `[]` per dimension and function
/// descriptors spell out their signature as `func(T1,T2):R`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDescriptor {
    pub kind: TypeKind,
    pub name: String,
}

impl TypeDescriptor {
    pub fn new(kind: TypeKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }

    pub fn any() -> Self {
        Self::new(TypeKind::Any, "any")
    }

    pub fn number() -> Self {
        Self::new(TypeKind::Number, "num")
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String, "string")
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean, "bool")
    }

    pub fn void() -> Self {
        Self::new(TypeKind::Void, "void")
    }

    pub fn type_value() -> Self {
        Self::new(TypeKind::TypeValue, "type")
    }

    pub fn null() -> Self {
        Self::new(TypeKind::Object, NULL_TYPE_NAME)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(TypeKind::Object, name)
    }

    pub fn function(params: &[TypeDescriptor], return_type: &TypeDescriptor) -> Self {
        let params: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        Self::object(format!("func({}):{}", params.join(","), return_type.name))
    }

    pub fn array_of(&self) -> Self {
        Self::new(self.kind, format!("{}{ARRAY_SUFFIX}", self.name))
    }

    pub fn is_array(&self) -> bool {
        self.name.ends_with(ARRAY_SUFFIX)
    }

    pub fn is_null(&self) -> bool {
        self.kind == TypeKind::Object && self.name == NULL_TYPE_NAME
    }

    pub fn is_function(&self) -> bool {
        self.kind == TypeKind::Object && self.name.starts_with("func(")
    }

    /// Array dimensions, `num[][]` has two.
    pub fn dimensions(&self) -> usize {
        let mut name = self.name.as_str();
        let mut count = 0;
        while let Some(stripped) = name.strip_suffix(ARRAY_SUFFIX) {
            name = stripped;
            count += 1;
        }
        count
    }

    /// The element descriptor of an array type, one dimension removed.
    pub fn element(&self) -> Self {
        match self.name.strip_suffix(ARRAY_SUFFIX) {
            Some(name) => Self::new(self.kind, name),
            None => self.clone(),
        }
    }

    /// The descriptor with every array dimension removed.
    pub fn base(&self) -> Self {
        let mut base = self.clone();
        while base.is_array() {
            base = base.element();
        }
        base
    }

    fn is_plain_any(&self) -> bool {
        self.kind == TypeKind::Any && !self.is_array()
    }

    pub fn matches(&self, other: &TypeDescriptor) -> bool {
        if self.is_plain_any() || other.is_plain_any() {
            return true;
        }

        if self.is_array() || other.is_array() {
            if self.is_null() || other.is_null() {
                return true;
            }
            return self.is_array() && other.is_array() && self.element().matches(&other.element());
        }

        match (self.kind, other.kind) {
            (TypeKind::Object, TypeKind::Object) => {
                self.name == other.name || self.is_null() || other.is_null()
            }
            (TypeKind::Void, _) if other.is_null() => true,
            (_, TypeKind::Void) if self.is_null() => true,
            (left, right) => left == right && self.name == other.name,
        }
    }

    pub fn mismatch(&self, other: &TypeDescriptor) -> bool {
        !self.matches(other)
    }
}

impl Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<TypeDescriptor> {
        vec![
            TypeDescriptor::any(),
            TypeDescriptor::number(),
            TypeDescriptor::string(),
            TypeDescriptor::boolean(),
            TypeDescriptor::void(),
            TypeDescriptor::type_value(),
            TypeDescriptor::null(),
            TypeDescriptor::object("Point"),
            TypeDescriptor::number().array_of(),
            TypeDescriptor::function(&[TypeDescriptor::number()], &TypeDescriptor::string()),
        ]
    }

    #[test]
    fn matching_is_reflexive() {
        for t in samples() {
            assert!(t.matches(&t), "{t} should match itself");
        }
    }

    #[test]
    fn any_absorbs_everything() {
        let any = TypeDescriptor::any();
        for t in samples() {
            assert!(any.matches(&t));
            assert!(t.matches(&any));
        }
    }

    #[test]
    fn objects_are_nominal() {
        let point = TypeDescriptor::object("Point");
        let circle = TypeDescriptor::object("Circle");
        assert!(point.mismatch(&circle));
        assert!(point.matches(&TypeDescriptor::null()));
        assert!(TypeDescriptor::null().matches(&circle));
    }

    #[test]
    fn void_interoperates_with_null() {
        assert!(TypeDescriptor::void().matches(&TypeDescriptor::null()));
        assert!(TypeDescriptor::null().matches(&TypeDescriptor::void()));
        assert!(TypeDescriptor::void().mismatch(&TypeDescriptor::number()));
    }

    #[test]
    fn primitives_do_not_mix() {
        assert!(TypeDescriptor::number().mismatch(&TypeDescriptor::string()));
        assert!(TypeDescriptor::boolean().mismatch(&TypeDescriptor::null()));
    }

    #[test]
    fn arrays_compare_by_element() {
        let nums = TypeDescriptor::number().array_of();
        let strings = TypeDescriptor::string().array_of();
        assert_eq!(nums.name, "num[]");
        assert!(nums.mismatch(&strings));
        assert!(nums.mismatch(&TypeDescriptor::number()));
        assert!(nums.matches(&TypeDescriptor::any().array_of()));
        assert_eq!(nums.array_of().dimensions(), 2);
        assert_eq!(nums.array_of().base(), TypeDescriptor::number());
    }

    #[test]
    fn function_signatures() {
        let sig = TypeDescriptor::function(
            &[TypeDescriptor::number(), TypeDescriptor::string()],
            &TypeDescriptor::boolean(),
        );
        assert_eq!(sig.name, "func(num,string):bool");
        assert!(sig.is_function());
    }

    #[test]
    fn modifier_signature_ignores_ranges() {
        let m = ModifierSet::CONST | ModifierSet::UNSIGNED;
        assert_eq!(m.signature(), ModifierSet::CONST);
        assert_eq!(format!("{}", ModifierSet::STATIC | ModifierSet::OPERATOR), "static operator");
    }
}
