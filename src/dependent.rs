use std::any::Any;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt::{self, Debug, Formatter};
use std::rc::{Rc, Weak};

/// A value a selector depends on.
///
/// Dependents are compared by identity, not by value: two structurally equal
/// values living in different allocations are different dependents. Cloning a
/// `Dependent` is cheap and yields the same identity.
#[derive(Clone)]
pub struct Dependent(Rc<dyn Any>);

impl Dependent {
    /// Wrap a shared value.
    #[inline]
    pub fn new<T: Any>(value: Rc<T>) -> Self {
        Self(value)
    }

    /// The identity of the dependent's allocation.
    #[inline]
    pub fn identity(&self) -> Identity {
        Identity(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Try to view the dependent as a value of type `T`.
    #[inline]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Try to recover the shared value as an `Rc<T>`.
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        self.0.clone().downcast().ok()
    }

    /// Whether two dependents share the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Create a non-owning anchor for this dependent.
    pub(crate) fn downgrade(&self) -> Weak<dyn Any> {
        Rc::downgrade(&self.0)
    }
}

impl<T: Any> From<Rc<T>> for Dependent {
    #[inline]
    fn from(value: Rc<T>) -> Self {
        Self::new(value)
    }
}

impl<T: Any> From<&Rc<T>> for Dependent {
    #[inline]
    fn from(value: &Rc<T>) -> Self {
        Self::new(value.clone())
    }
}

impl Debug for Dependent {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Dependent({:#x})", self.identity().0)
    }
}

/// The address of a dependent's allocation.
///
/// Only meaningful while something keeps the allocation reserved, either a
/// strong `Dependent` or a `Weak` anchor in the cache.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Identity(usize);

/// A named set of dependents, produced fresh for every selector call.
///
/// Entries are kept sorted by name, which is the canonical order the cache
/// is walked in. Insertion order therefore never matters.
#[derive(Clone, Default)]
pub struct Dependents {
    map: BTreeMap<String, Dependent>,
}

impl Dependents {
    /// Create an empty set of dependents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependent, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, dependent: impl Into<Dependent>) {
        self.map.insert(name.into(), dependent.into());
    }

    /// Add a dependent in builder style.
    pub fn with(mut self, name: impl Into<String>, dependent: impl Into<Dependent>) -> Self {
        self.insert(name, dependent);
        self
    }

    /// Look up a dependent by name.
    pub fn dependent(&self, name: &str) -> Option<&Dependent> {
        self.map.get(name)
    }

    /// Look up a dependent by name and recover its shared value.
    pub fn get<T: Any>(&self, name: &str) -> Option<Rc<T>> {
        self.map.get(name)?.downcast()
    }

    /// Look up a dependent by name and borrow its value.
    pub fn get_ref<T: Any>(&self, name: &str) -> Option<&T> {
        self.map.get(name)?.downcast_ref()
    }

    /// The number of dependents.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no dependents at all.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterate over the dependents in canonical (name) order.
    pub fn iter(&self) -> Iter<'_> {
        Iter(self.map.iter())
    }

    /// The dependents in canonical order, with their names discarded.
    pub fn sequence(&self) -> impl ExactSizeIterator<Item = &Dependent> + '_ {
        self.map.values()
    }
}

impl Debug for Dependents {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Dependents
where
    K: Into<String>,
    V: Into<Dependent>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dependents = Self::new();
        for (name, dependent) in iter {
            dependents.insert(name, dependent);
        }
        dependents
    }
}

impl<'a> IntoIterator for &'a Dependents {
    type Item = (&'a str, &'a Dependent);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over named dependents in canonical order.
pub struct Iter<'a>(btree_map::Iter<'a, String, Dependent>);

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Dependent);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(name, dependent)| (name.as_str(), dependent))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Build a [`Dependents`] set from `name: value` pairs.
///
/// Each value must convert into a [`Dependent`], e.g. an `Rc<T>` or a
/// reference to one.
///
/// ```
/// use std::rc::Rc;
///
/// let posts = Rc::new(vec!["hello"]);
/// let dependents = memoselect::dependents! { posts: &posts };
/// assert_eq!(dependents.len(), 1);
/// ```
#[macro_export]
macro_rules! dependents {
    ($($name:ident : $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut dependents = $crate::Dependents::new();
        $(dependents.insert(stringify!($name), $value);)*
        dependents
    }};
}
