use std::cell::RefCell;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use crate::args::Arguments;
use crate::dependent::Dependents;
use crate::diagnostics::{self, Sink, Warning};
use crate::error::{InvalidArgumentError, Result};
use crate::shape::{self, Shape};
use crate::tree::CacheTree;

/// Computes a selector's output from its dependents and arguments.
type Compute<A, Out> = Box<dyn Fn(&Dependents, &A) -> Out>;

/// Derives a selector's dependents from the state and arguments.
type Derive<S, A> = Box<dyn Fn(&S, &A) -> Option<Dependents>>;

/// A memoizing selector.
///
/// Wraps a pure computation over some state. Every call first derives the
/// computation's dependents from the state, then looks for a result that
/// was memoized for exactly these dependents (by identity) and the same
/// argument signature. Only on a miss is the computation run.
///
/// The cache is never invalidated explicitly. The cache itself holds
/// dependents only weakly, and results that belong to a dependent which no
/// longer exists are dropped lazily. A result that holds a strong reference
/// to one of its own dependents keeps that dependent alive for as long as
/// the selector lives, so return derived data or a [`Weak`](std::rc::Weak)
/// instead.
///
/// Warnings go to [`diagnostics::log`] unless another sink is set. That is a
/// `tracing` event, so nothing is printed if the host has not installed a
/// subscriber. Pass [`diagnostics::stderr`] to
/// [`SelectorBuilder::sink`] to see them without one.
///
/// Selectors are single-threaded: they are neither `Send` nor `Sync`.
///
/// ```
/// use std::rc::Rc;
/// use memoselect::{Dependents, dependents};
///
/// struct State {
///     posts: Rc<Vec<(u32, char)>>,
/// }
///
/// let site_posts = memoselect::create(
///     |deps: &Dependents, &(site,): &(char,)| {
///         let posts = deps.get_ref::<Vec<(u32, char)>>("posts").unwrap();
///         posts.iter().filter(|post| post.1 == site).map(|post| post.0).collect::<Vec<_>>()
///     },
///     |state: &State, _: &(char,)| dependents! { posts: &state.posts },
/// );
///
/// let state = State { posts: Rc::new(vec![(1, 'a'), (2, 'b'), (3, 'a')]) };
/// assert_eq!(site_posts.call(&state, ('a',)), Some(vec![1, 3]));
/// ```
pub struct Selector<S: ?Sized, A, Out> {
    compute: Compute<A, Out>,
    derive: Derive<S, A>,
    sink: Sink,
    tree: RefCell<CacheTree<Out>>,
}

impl<S: ?Sized, A, Out> Selector<S, A, Out> {
    /// Start building a selector.
    pub fn builder() -> SelectorBuilder<S, A, Out> {
        SelectorBuilder::new()
    }

    /// The number of results currently memoized.
    pub fn len(&self) -> usize {
        self.tree.borrow().len()
    }

    /// Whether no results are memoized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S, A, Out> Selector<S, A, Out>
where
    S: ?Sized,
    A: Arguments,
    Out: Clone,
{
    /// Select from the state, reusing a memoized result if possible.
    ///
    /// Returns `None` if the deriver did not produce a non-empty set of
    /// dependents. That case and complex arguments are reported to the
    /// selector's sink. Panics from the compute function or the deriver
    /// propagate unchanged.
    pub fn call(&self, state: &S, args: A) -> Option<Out> {
        let dependents = (self.derive)(state, &args);

        if args.any_complex() {
            self.warn(Warning::ComplexArguments);
        }

        let Some(dependents) = dependents else {
            self.warn(Warning::InvalidDependents);

            #[cfg(feature = "testing")]
            crate::testing::register_miss();

            return None;
        };

        let signature = args.signature();

        // The borrow must end before `compute` runs, nested calls to this
        // selector would panic otherwise.
        let hit = self.tree.borrow_mut().get(dependents.sequence(), &signature).cloned();
        if let Some(output) = hit {
            tracing::trace!(target: "memoselect", %signature, "hit");

            #[cfg(feature = "testing")]
            crate::testing::register_hit();

            return Some(output);
        }

        tracing::trace!(target: "memoselect", %signature, "miss");
        let output = (self.compute)(&dependents, &args);
        let output = self
            .tree
            .borrow_mut()
            .insert(dependents.sequence(), signature, output)
            .clone();

        #[cfg(feature = "testing")]
        crate::testing::register_miss();

        Some(output)
    }

    fn warn(&self, warning: Warning) {
        (self.sink)(&warning);
    }
}

impl<S: ?Sized, A, Out> Debug for Selector<S, A, Out> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad("Selector(..)")
    }
}

/// Create a selector from a compute function and a dependents deriver.
///
/// Warnings go to the default `tracing` sink, which is silent without a
/// subscriber. Use [`Selector::builder`] to pick another one.
pub fn create<S, A, Out, C, D, R>(compute: C, derive: D) -> Selector<S, A, Out>
where
    S: ?Sized,
    C: Fn(&Dependents, &A) -> Out + 'static,
    D: Fn(&S, &A) -> R + 'static,
    R: Shape,
{
    Selector {
        compute: Box::new(compute),
        derive: wrap(derive),
        sink: diagnostics::default_sink(),
        tree: RefCell::new(CacheTree::new()),
    }
}

/// Builder for a [`Selector`].
///
/// Both the compute function and the dependents deriver are required.
///
/// ```
/// use memoselect::{InvalidArgumentError, Selector};
///
/// let result = Selector::<(), (), u32>::builder()
///     .dependents(|_: &(), _: &()| memoselect::Dependents::new())
///     .build();
/// assert_eq!(result.unwrap_err(), InvalidArgumentError::MissingCompute);
/// ```
pub struct SelectorBuilder<S: ?Sized, A, Out> {
    compute: Option<Compute<A, Out>>,
    derive: Option<Derive<S, A>>,
    sink: Option<Sink>,
}

impl<S: ?Sized, A, Out> SelectorBuilder<S, A, Out> {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self { compute: None, derive: None, sink: None }
    }

    /// Set the computation to memoize.
    pub fn compute<C>(mut self, compute: C) -> Self
    where
        C: Fn(&Dependents, &A) -> Out + 'static,
    {
        self.compute = Some(Box::new(compute));
        self
    }

    /// Set the function that derives the dependents from the state.
    pub fn dependents<D, R>(mut self, derive: D) -> Self
    where
        D: Fn(&S, &A) -> R + 'static,
        R: Shape,
    {
        self.derive = Some(wrap(derive));
        self
    }

    /// Set where warnings go.
    ///
    /// Defaults to [`diagnostics::log`], a `tracing` event that goes nowhere
    /// unless a subscriber is installed. [`diagnostics::stderr`] prints
    /// without one.
    pub fn sink(mut self, sink: impl Fn(&Warning) + 'static) -> Self {
        self.sink = Some(Rc::new(sink));
        self
    }

    /// Build the selector with a fresh, empty cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the compute function or the deriver was not set.
    /// The compute function is checked first.
    pub fn build(self) -> Result<Selector<S, A, Out>> {
        let compute = self.compute.ok_or(InvalidArgumentError::MissingCompute)?;
        let derive = self.derive.ok_or(InvalidArgumentError::MissingDependents)?;
        Ok(Selector {
            compute,
            derive,
            sink: self.sink.unwrap_or_else(diagnostics::default_sink),
            tree: RefCell::new(CacheTree::new()),
        })
    }
}

impl<S: ?Sized, A, Out> Default for SelectorBuilder<S, A, Out> {
    fn default() -> Self {
        Self::new()
    }
}

/// Erase the deriver's return type, validating its shape on the way.
fn wrap<S, A, D, R>(derive: D) -> Derive<S, A>
where
    S: ?Sized,
    D: Fn(&S, &A) -> R + 'static,
    R: Shape,
{
    Box::new(move |state: &S, args: &A| shape::validate(derive(state, args)))
}
