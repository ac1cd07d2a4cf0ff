//! Type and method metadata.
//!
//! Components describe themselves with a [`TypeDescriptor`]. The pointcut
//! builder resolves selectors against it, qualifiers inspect its
//! [`MethodMarker`]s, and proxies dispatch on its [`MethodDescriptor`]s.

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// MethodMarker
// ─────────────────────────────────────────────────────────────────────────────

/// A declarative mark on a method, read by qualifiers and consumer aspects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodMarker {
    /// Results are cached in the named cache.
    Cache {
        /// Cache name.
        name: String,
    },
    /// Calling the method evicts the named caches, or every cache when empty.
    EvictCache {
        /// Cache names to clear.
        names: Vec<String>,
    },
    /// Calling the method publishes an event.
    Event {
        /// Event name; the method name when absent.
        name: Option<String>,
        /// Parameter index and payload key of each published argument.
        payload: Vec<(usize, String)>,
    },
    /// Any application-defined mark.
    Custom(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// MethodDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// A callable method of a component type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Fully qualified name of the declaring type.
    pub declaring_type: String,
    /// Method name.
    pub name: String,
    /// Parameter type names, in declaration order.
    pub parameter_types: Vec<String>,
    /// Marks carried by the method.
    pub markers: Vec<MethodMarker>,
}

impl MethodDescriptor {
    /// Creates a descriptor with no markers.
    pub fn new<I, S>(declaring_type: impl Into<String>, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameter_types: params.into_iter().map(Into::into).collect(),
            markers: Vec::new(),
        }
    }

    /// Adds a marker.
    #[must_use]
    pub fn with_marker(mut self, marker: MethodMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Renders `name(T1,T2)`.
    #[must_use]
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.parameter_types.join(","))
    }

    /// Returns `true` if this method has the given name and exactly these
    /// parameter type names, in order.
    #[must_use]
    pub fn matches<S: AsRef<str>>(&self, name: &str, params: &[S]) -> bool {
        self.name == name
            && self.parameter_types.len() == params.len()
            && self
                .parameter_types
                .iter()
                .zip(params)
                .all(|(own, other)| own == other.as_ref())
    }

    /// Returns the first marker accepted by `predicate`.
    pub fn marker(&self, predicate: impl Fn(&MethodMarker) -> bool) -> Option<&MethodMarker> {
        self.markers.iter().find(|marker| predicate(marker))
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.signature())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TypeDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Shape of a component type: its name, ancestry, and methods.
///
/// # Example
///
/// ```
/// use weft_aop::meta::TypeDescriptor;
///
/// let foo = TypeDescriptor::new("com.example.Foo")
///     .with_interface("com.example.Bar")
///     .with_method("bar", Vec::<&str>::new())
///     .with_method("bar", ["int"]);
///
/// assert_eq!(foo.simple_name(), "Foo");
/// assert_eq!(foo.methods_named("bar").count(), 2);
/// assert!(foo.method("bar", &["int"]).is_some());
/// assert!(foo.is_assignable_to("com.example.Bar"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeDescriptor {
    /// Fully qualified type name.
    pub name: String,
    /// Concrete supertype, if any.
    pub supertype: Option<String>,
    /// Implemented interfaces.
    pub interfaces: Vec<String>,
    /// Methods, in declaration order.
    pub methods: Vec<MethodDescriptor>,
}

impl TypeDescriptor {
    /// Creates a descriptor with no ancestry and no methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the supertype.
    #[must_use]
    pub fn with_supertype(mut self, supertype: impl Into<String>) -> Self {
        self.supertype = Some(supertype.into());
        self
    }

    /// Adds an implemented interface.
    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Adds a method declared by this type.
    #[must_use]
    pub fn with_method<I, S>(self, name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let method = MethodDescriptor::new(self.name.clone(), name, params);
        self.with_method_descriptor(method)
    }

    /// Adds a method that carries a marker.
    #[must_use]
    pub fn with_marked_method<I, S>(
        self,
        name: impl Into<String>,
        params: I,
        marker: MethodMarker,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let method = MethodDescriptor::new(self.name.clone(), name, params).with_marker(marker);
        self.with_method_descriptor(method)
    }

    /// Adds a prebuilt method descriptor.
    #[must_use]
    pub fn with_method_descriptor(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Name after the last `.` or `::` separator.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit("::").next().unwrap_or(&self.name);
        tail.rsplit('.').next().unwrap_or(tail)
    }

    /// Finds the overload with exactly these parameter types.
    pub fn method<S: AsRef<str>>(&self, name: &str, params: &[S]) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.matches(name, params))
    }

    /// Every overload named `name`, in declaration order.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDescriptor> {
        self.methods.iter().filter(move |method| method.name == name)
    }

    /// Returns `true` if any method carries a marker accepted by `predicate`.
    pub fn has_method_marker(&self, predicate: impl Fn(&MethodMarker) -> bool) -> bool {
        self.methods
            .iter()
            .any(|method| method.markers.iter().any(&predicate))
    }

    /// Returns `true` if a value of this type can stand in for `type_name`.
    #[must_use]
    pub fn is_assignable_to(&self, type_name: &str) -> bool {
        self.name == type_name
            || self.supertype.as_deref() == Some(type_name)
            || self.interfaces.iter().any(|interface| interface == type_name)
    }
}
