//! Registered type descriptors.
//!
//! The engine has no runtime reflection to lean on, so every host type a
//! template can touch is described explicitly: a [`TypeDescriptor`] carries
//! the type's template-visible methods, fields, and ancestry, and is built
//! once through [`DescriptorBuilder`]. Each build mints a fresh
//! [`TypeIdentity`]; re-registering a type under the same name therefore
//! produces a distinct identity, which is what makes hot reload safe. Member
//! tables and caches key on identity, never on name.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::error::InvokeError;
use crate::value::Value;

/// Process-unique identity of one registered descriptor instance.
///
/// Two descriptors built from the same declarations still compare unequal;
/// identity equality means "the very same registration".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeIdentity(u64);

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

impl TypeIdentity {
    fn mint() -> Self {
        TypeIdentity(NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric form, for logging.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A formal parameter or return type in a registered signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Boolean.
    Bool,
    /// Character.
    Char,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// String.
    Str,
    /// Sequence with a declared element type. Element types are erased at
    /// resolution time, matching how runtime sequences are untyped.
    List(Box<TypeDesc>),
    /// Map.
    Map,
    /// Registered object type, referenced by name so descriptors can point
    /// at types registered later (or re-registered with a new identity).
    Object(Arc<str>),
    /// The unconstrained top type. Primitives reach it by autoboxing.
    Any,
}

impl TypeDesc {
    /// Object type reference by registered name.
    pub fn object(name: impl Into<Arc<str>>) -> Self {
        TypeDesc::Object(name.into())
    }

    /// Sequence type with the given element type.
    pub fn list_of(elem: TypeDesc) -> Self {
        TypeDesc::List(Box::new(elem))
    }

    /// The erased name of this type, used as a conversion-registry key.
    /// Sequence element types do not participate: every `list<..>` erases
    /// to `"list"`.
    pub fn name(&self) -> Cow<'_, str> {
        match self {
            TypeDesc::Bool => Cow::Borrowed("bool"),
            TypeDesc::Char => Cow::Borrowed("char"),
            TypeDesc::I8 => Cow::Borrowed("i8"),
            TypeDesc::I16 => Cow::Borrowed("i16"),
            TypeDesc::I32 => Cow::Borrowed("i32"),
            TypeDesc::I64 => Cow::Borrowed("i64"),
            TypeDesc::F32 => Cow::Borrowed("f32"),
            TypeDesc::F64 => Cow::Borrowed("f64"),
            TypeDesc::Str => Cow::Borrowed("str"),
            TypeDesc::List(_) => Cow::Borrowed("list"),
            TypeDesc::Map => Cow::Borrowed("map"),
            TypeDesc::Object(name) => Cow::Borrowed(name),
            TypeDesc::Any => Cow::Borrowed("any"),
        }
    }

    /// True for unboxed types: booleans, characters, and numerics.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TypeDesc::Bool
                | TypeDesc::Char
                | TypeDesc::I8
                | TypeDesc::I16
                | TypeDesc::I32
                | TypeDesc::I64
                | TypeDesc::F32
                | TypeDesc::F64
        )
    }

    /// True for reference-like types, the ones a null argument satisfies.
    pub fn is_reference(&self) -> bool {
        !self.is_primitive()
    }

    /// Equality under sequence-element erasure.
    pub fn erased_eq(&self, other: &TypeDesc) -> bool {
        match (self, other) {
            (TypeDesc::List(_), TypeDesc::List(_)) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::List(elem) => write!(f, "list<{elem}>"),
            other => write!(f, "{}", other.name()),
        }
    }
}

bitflags! {
    /// Metadata flags on a registered member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemberFlags: u8 {
        /// Visible to templates. Non-public members never enter a member
        /// table.
        const PUBLIC = 1 << 0;
        /// Static member; skips accessibility normalization.
        const STATIC = 1 << 1;
        /// Resolving this member should raise a deprecation warning.
        const DEPRECATED = 1 << 2;
        /// The trailing parameter absorbs a variable number of arguments.
        const VARIADIC = 1 << 3;
    }
}

/// The type a member was declared on: its registered name plus whether that
/// type is exported to templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaringType {
    /// Registered name of the declaring type.
    pub name: Arc<str>,
    /// Whether the declaring type is exported.
    pub exported: bool,
}

impl DeclaringType {
    /// Placeholder stamped over by [`DescriptorBuilder::build`].
    fn pending() -> Self {
        DeclaringType {
            name: Arc::from(""),
            exported: true,
        }
    }
}

/// Invoker closure bound to a registered method. Receives the receiver
/// value and the already-converted arguments.
pub type MethodInvoker =
    Arc<dyn Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync>;

/// Reader closure bound to a registered field.
pub type FieldGetter = Arc<dyn Fn(&Value) -> Result<Value, InvokeError> + Send + Sync>;

/// Writer closure bound to a registered field.
pub type FieldSetter = Arc<dyn Fn(&Value, Value) -> Result<(), InvokeError> + Send + Sync>;

/// A registered method signature.
///
/// Immutable once built; the descriptor builder stamps [`declared_by`]
/// when the signature is attached to a type.
///
/// [`declared_by`]: MethodSig::declared_by
#[derive(Clone)]
pub struct MethodSig {
    /// Member name as written in templates.
    pub name: Arc<str>,
    /// Ordered formal parameter types.
    pub params: Vec<TypeDesc>,
    /// Declared return type.
    pub returns: TypeDesc,
    /// Member metadata flags.
    pub flags: MemberFlags,
    /// The type this signature was declared on.
    pub declared_by: DeclaringType,
    invoker: Option<MethodInvoker>,
}

impl MethodSig {
    /// New public method signature.
    pub fn new(
        name: impl Into<Arc<str>>,
        params: impl Into<Vec<TypeDesc>>,
        returns: TypeDesc,
    ) -> Self {
        MethodSig {
            name: name.into(),
            params: params.into(),
            returns,
            flags: MemberFlags::PUBLIC,
            declared_by: DeclaringType::pending(),
            invoker: None,
        }
    }

    /// Attaches the invoker closure called after argument conversion.
    pub fn with_invoker(
        mut self,
        f: impl Fn(&Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        self.invoker = Some(Arc::new(f));
        self
    }

    /// Marks the trailing parameter as variadic. Only meaningful when the
    /// final parameter is a sequence type; the flag is ignored otherwise.
    pub fn variadic(mut self) -> Self {
        self.flags |= MemberFlags::VARIADIC;
        self
    }

    /// Marks the member static.
    pub fn static_member(mut self) -> Self {
        self.flags |= MemberFlags::STATIC;
        self
    }

    /// Marks the member deprecated.
    pub fn deprecated(mut self) -> Self {
        self.flags |= MemberFlags::DEPRECATED;
        self
    }

    /// Hides the member from templates.
    pub fn non_public(mut self) -> Self {
        self.flags -= MemberFlags::PUBLIC;
        self
    }

    /// Whether this signature actually absorbs trailing arguments: the flag
    /// is set and the final parameter is a sequence.
    pub fn is_variadic(&self) -> bool {
        self.flags.contains(MemberFlags::VARIADIC)
            && matches!(self.params.last(), Some(TypeDesc::List(_)))
    }

    /// Element type of the variadic tail, when [`is_variadic`] holds.
    ///
    /// [`is_variadic`]: MethodSig::is_variadic
    pub fn variadic_element(&self) -> Option<&TypeDesc> {
        if !self.flags.contains(MemberFlags::VARIADIC) {
            return None;
        }
        match self.params.last() {
            Some(TypeDesc::List(elem)) => Some(elem),
            _ => None,
        }
    }

    /// The bound invoker, if one was registered.
    pub fn invoker(&self) -> Option<&MethodInvoker> {
        self.invoker.as_ref()
    }

    /// Same name and same erased formal list.
    pub fn erased_matches(&self, other: &MethodSig) -> bool {
        self.name == other.name
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.erased_eq(b))
    }

    /// Calls the bound invoker directly, without argument conversion.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, InvokeError> {
        match &self.invoker {
            Some(f) => f(target, args),
            None => Err(InvokeError::host(
                self.name.as_ref(),
                "no invoker registered for this signature",
            )),
        }
    }
}

impl fmt::Debug for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSig")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("flags", &self.flags)
            .field("declared_by", &self.declared_by)
            .field("has_invoker", &self.invoker.is_some())
            .finish()
    }
}

/// A registered field.
#[derive(Clone)]
pub struct FieldSig {
    /// Field name as written in templates.
    pub name: Arc<str>,
    /// Declared field type.
    pub ty: TypeDesc,
    /// Member metadata flags.
    pub flags: MemberFlags,
    /// The type this field was declared on.
    pub declared_by: DeclaringType,
    getter: Option<FieldGetter>,
    setter: Option<FieldSetter>,
}

impl FieldSig {
    /// New public field.
    pub fn new(name: impl Into<Arc<str>>, ty: TypeDesc) -> Self {
        FieldSig {
            name: name.into(),
            ty,
            flags: MemberFlags::PUBLIC,
            declared_by: DeclaringType::pending(),
            getter: None,
            setter: None,
        }
    }

    /// Attaches the reader closure.
    pub fn with_getter(
        mut self,
        f: impl Fn(&Value) -> Result<Value, InvokeError> + Send + Sync + 'static,
    ) -> Self {
        self.getter = Some(Arc::new(f));
        self
    }

    /// Attaches the writer closure, making the field settable.
    pub fn with_setter(
        mut self,
        f: impl Fn(&Value, Value) -> Result<(), InvokeError> + Send + Sync + 'static,
    ) -> Self {
        self.setter = Some(Arc::new(f));
        self
    }

    /// Marks the field deprecated.
    pub fn deprecated(mut self) -> Self {
        self.flags |= MemberFlags::DEPRECATED;
        self
    }

    /// Hides the field from templates.
    pub fn non_public(mut self) -> Self {
        self.flags -= MemberFlags::PUBLIC;
        self
    }

    /// Whether a reader closure was registered.
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    /// Whether a writer closure was registered.
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Reads the field off the receiver.
    pub fn read(&self, target: &Value) -> Result<Value, InvokeError> {
        match &self.getter {
            Some(f) => f(target),
            None => Err(InvokeError::host(
                self.name.as_ref(),
                "no getter registered for this field",
            )),
        }
    }

    /// Writes the field on the receiver.
    pub fn write(&self, target: &Value, value: Value) -> Result<(), InvokeError> {
        match &self.setter {
            Some(f) => f(target, value),
            None => Err(InvokeError::host(
                self.name.as_ref(),
                "field is not writable",
            )),
        }
    }
}

impl fmt::Debug for FieldSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSig")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("flags", &self.flags)
            .field("declared_by", &self.declared_by)
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

/// The registered description of one host type.
pub struct TypeDescriptor {
    name: Arc<str>,
    identity: TypeIdentity,
    exported: bool,
    extends: Option<Arc<TypeDescriptor>>,
    interfaces: Vec<Arc<TypeDescriptor>>,
    methods: Vec<MethodSig>,
    fields: Vec<FieldSig>,
    constants: IndexMap<Arc<str>, Value>,
}

impl TypeDescriptor {
    /// Registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered name as a shared handle.
    pub fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    /// This registration's identity.
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// Whether the type is exported to templates.
    pub fn is_exported(&self) -> bool {
        self.exported
    }

    /// Superclass, if any.
    pub fn extends(&self) -> Option<&Arc<TypeDescriptor>> {
        self.extends.as_ref()
    }

    /// Implemented or extended interfaces, in declaration order.
    pub fn interfaces(&self) -> &[Arc<TypeDescriptor>] {
        &self.interfaces
    }

    /// Declared methods, in declaration order.
    pub fn methods(&self) -> &[MethodSig] {
        &self.methods
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldSig] {
        &self.fields
    }

    /// Enumeration constants, in declaration order.
    pub fn constants(&self) -> &IndexMap<Arc<str>, Value> {
        &self.constants
    }

    /// Whether this descriptor declares enumeration constants.
    pub fn is_enum(&self) -> bool {
        !self.constants.is_empty()
    }

    /// This type as a member's declaring-type handle.
    pub fn declaring_type(&self) -> DeclaringType {
        DeclaringType {
            name: self.name.clone(),
            exported: self.exported,
        }
    }

    /// Whether `name` names this type or any ancestor (superclass chain or
    /// interfaces, recursively).
    pub fn has_ancestor_named(&self, name: &str) -> bool {
        if &*self.name == name {
            return true;
        }
        if let Some(parent) = &self.extends {
            if parent.has_ancestor_named(name) {
                return true;
            }
        }
        self.interfaces.iter().any(|i| i.has_ancestor_named(name))
    }

    /// Whether this descriptor itself declares a method with the same name
    /// and erased formal list as `sig`.
    pub fn declares_erased(&self, sig: &MethodSig) -> bool {
        self.methods.iter().any(|m| m.erased_matches(sig))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("identity", &self.identity)
            .field("exported", &self.exported)
            .field("extends", &self.extends.as_ref().map(|p| p.name()))
            .field(
                "interfaces",
                &self.interfaces.iter().map(|i| i.name()).collect::<Vec<_>>(),
            )
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .field("constants", &self.constants.len())
            .finish()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for TypeDescriptor {}

/// Builder for [`TypeDescriptor`]. Building mints a fresh identity and
/// stamps every attached member with this type as its declarer.
pub struct DescriptorBuilder {
    name: Arc<str>,
    exported: bool,
    extends: Option<Arc<TypeDescriptor>>,
    interfaces: Vec<Arc<TypeDescriptor>>,
    methods: Vec<MethodSig>,
    fields: Vec<FieldSig>,
    constants: IndexMap<Arc<str>, Value>,
}

impl DescriptorBuilder {
    /// Starts a descriptor for an exported type.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        DescriptorBuilder {
            name: name.into(),
            exported: true,
            extends: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            constants: IndexMap::new(),
        }
    }

    /// Marks the type as not exported. Its members still enter subtype
    /// member tables, but resolved signatures must be re-homed onto an
    /// exported ancestor before invocation.
    pub fn unexported(mut self) -> Self {
        self.exported = false;
        self
    }

    /// Sets the superclass.
    pub fn extends(mut self, parent: Arc<TypeDescriptor>) -> Self {
        self.extends = Some(parent);
        self
    }

    /// Adds an implemented interface.
    pub fn implements(mut self, iface: Arc<TypeDescriptor>) -> Self {
        self.interfaces.push(iface);
        self
    }

    /// Adds a method.
    pub fn method(mut self, sig: MethodSig) -> Self {
        self.methods.push(sig);
        self
    }

    /// Adds a field.
    pub fn field(mut self, sig: FieldSig) -> Self {
        self.fields.push(sig);
        self
    }

    /// Adds an enumeration constant.
    pub fn constant(mut self, name: impl Into<Arc<str>>, value: Value) -> Self {
        self.constants.insert(name.into(), value);
        self
    }

    /// Builds the descriptor, minting its identity.
    pub fn build(self) -> Arc<TypeDescriptor> {
        let declaring = DeclaringType {
            name: self.name.clone(),
            exported: self.exported,
        };
        let methods = self
            .methods
            .into_iter()
            .map(|mut m| {
                m.declared_by = declaring.clone();
                m
            })
            .collect();
        let fields = self
            .fields
            .into_iter()
            .map(|mut f| {
                f.declared_by = declaring.clone();
                f
            })
            .collect();
        Arc::new(TypeDescriptor {
            name: self.name,
            identity: TypeIdentity::mint(),
            exported: self.exported,
            extends: self.extends,
            interfaces: self.interfaces,
            methods,
            fields,
            constants: self.constants,
        })
    }
}
