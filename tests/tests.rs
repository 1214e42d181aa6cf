//! Run with `cargo test --all-features`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use memoselect::{Dependents, InvalidArgumentError, Selector, Warning, dependents};

macro_rules! test {
    (miss: $call:expr, $result:expr) => {{
        assert_eq!($call, $result);
        assert!(!memoselect::internal::last_was_hit());
    }};
    (hit: $call:expr, $result:expr) => {{
        assert_eq!($call, $result);
        assert!(memoselect::internal::last_was_hit());
    }};
}

#[derive(Debug, Clone, PartialEq)]
struct Post {
    id: &'static str,
    text: &'static str,
    site: &'static str,
    modified: bool,
}

const POST1: Post = Post { id: "id1", text: "here is post 1", site: "site1", modified: false };
const POST2: Post = Post { id: "id2", text: "here is post 2", site: "site1", modified: false };
const POST3: Post = Post { id: "id3", text: "here is post 3", site: "site2", modified: false };

type Posts = BTreeMap<&'static str, Rc<Post>>;

struct State {
    posts: Rc<Posts>,
}

impl State {
    fn new(posts: impl IntoIterator<Item = Post>) -> Self {
        Self::from_shared(posts.into_iter().map(Rc::new))
    }

    fn from_shared(posts: impl IntoIterator<Item = Rc<Post>>) -> Self {
        Self {
            posts: Rc::new(posts.into_iter().map(|post| (post.id, post)).collect()),
        }
    }
}

/// Counts computations and collects warnings.
#[derive(Default)]
struct Tally {
    calls: Rc<Cell<usize>>,
    warnings: Rc<RefCell<Vec<Warning>>>,
}

impl Tally {
    fn calls(&self) -> usize {
        self.calls.get()
    }

    fn warnings(&self) -> Vec<Warning> {
        self.warnings.borrow().clone()
    }

    /// A selector over the posts of a state.
    fn selector<A, Out>(
        &self,
        compute: impl Fn(&Posts, &A) -> Out + 'static,
    ) -> Selector<State, A, Out>
    where
        A: 'static,
    {
        let calls = self.calls.clone();
        let warnings = self.warnings.clone();
        Selector::builder()
            .compute(move |deps: &Dependents, args: &A| {
                calls.set(calls.get() + 1);
                compute(deps.get_ref::<Posts>("posts").unwrap(), args)
            })
            .dependents(|state: &State, _: &A| dependents! { posts: &state.posts })
            .sink(move |warning: &Warning| warnings.borrow_mut().push(*warning))
            .build()
            .unwrap()
    }

    /// Selects all posts of a site.
    fn site_posts(&self) -> Selector<State, (&'static str,), Vec<Post>> {
        self.selector(|posts: &Posts, &(site,): &(&'static str,)| {
            posts
                .values()
                .filter(|post| post.site == site)
                .map(|post| Post::clone(post))
                .collect()
        })
    }
}

/// Test that the selected value is correct.
#[test]
fn test_selects() {
    let tally = Tally::default();
    let site_posts = tally.site_posts();
    let state = State::new([POST1, POST2, POST3]);
    test!(miss: site_posts.call(&state, ("site1",)), Some(vec![POST1, POST2]));
    assert!(tally.warnings().is_empty());
}

/// Test that a repeated call is served from the cache.
#[test]
fn test_caches() {
    let tally = Tally::default();
    let count = tally.selector(|posts: &Posts, _: &(u32,)| posts.len());
    let state = State::new([POST1, POST2, POST3]);
    test!(miss: count.call(&state, (2916284,)), Some(3));
    test!(hit: count.call(&state, (2916284,)), Some(3));
    assert_eq!(tally.calls(), 1);
    assert_eq!(count.len(), 1);
}

/// Test that differing arguments get their own entries.
#[test]
fn test_differing_arguments() {
    let tally = Tally::default();
    let site_posts = tally.site_posts();
    let state = State::new([POST1, POST3]);
    test!(miss: site_posts.call(&state, (POST1.site,)), Some(vec![POST1]));
    test!(miss: site_posts.call(&state, (POST3.site,)), Some(vec![POST3]));
    test!(hit: site_posts.call(&state, (POST1.site,)), Some(vec![POST1]));
    assert_eq!(tally.calls(), 2);
}

/// Test that a new dependent busts the cache.
#[test]
fn test_bust_on_new_dependent() {
    let tally = Tally::default();
    let site_posts = tally.site_posts();

    let prev = State::new([POST1]);
    test!(miss: site_posts.call(&prev, (POST1.site,)), Some(vec![POST1]));

    let modified = Post { modified: true, ..POST1 };
    let next = State::new([modified.clone(), POST3]);
    test!(miss: site_posts.call(&next, (POST1.site,)), Some(vec![modified]));
    assert_eq!(tally.calls(), 2);
}

/// Test that structurally equal dependents are still different dependents.
#[test]
fn test_identity_not_equality() {
    let tally = Tally::default();
    let site_posts = tally.site_posts();
    let a = State::new([POST1, POST2]);
    let b = State::new([POST1, POST2]);
    assert_eq!(a.posts, b.posts);
    test!(miss: site_posts.call(&a, ("site1",)), Some(vec![POST1, POST2]));
    test!(miss: site_posts.call(&b, ("site1",)), Some(vec![POST1, POST2]));
    test!(hit: site_posts.call(&a, ("site1",)), Some(vec![POST1, POST2]));
    assert_eq!(tally.calls(), 2);
}

/// Test that the cache is kept per dependent that an argument selects.
#[test]
fn test_per_key() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let post_with_data = memoselect::create(
        move |deps: &Dependents, _: &(&'static str,)| {
            counter.set(counter.get() + 1);
            let post = deps.get_ref::<Post>("post").unwrap();
            (post.clone(), true)
        },
        |state: &State, &(id,): &(&'static str,)| dependents! { post: &state.posts[id] },
    );

    let post1 = Rc::new(POST1);
    let prev = State::from_shared([post1.clone()]);
    test!(miss: post_with_data.call(&prev, (POST1.id,)), Some((POST1, true)));

    // Another post was added, but the selected one is the same allocation.
    let next = State::from_shared([post1, Rc::new(POST2)]);
    test!(hit: post_with_data.call(&next, (POST1.id,)), Some((POST1, true)));
    test!(hit: post_with_data.call(&next, (POST1.id,)), Some((POST1, true)));
    test!(miss: post_with_data.call(&next, (POST2.id,)), Some((POST2, true)));
    assert_eq!(calls.get(), 2);
}

/// Test that the order in which dependents are named does not matter.
#[test]
fn test_dependent_order() {
    struct Pair {
        a: Rc<u32>,
        b: Rc<u32>,
        flip: Cell<bool>,
    }

    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let sum = memoselect::create(
        move |deps: &Dependents, _: &()| {
            counter.set(counter.get() + 1);
            deps.get_ref::<u32>("a").unwrap() + deps.get_ref::<u32>("b").unwrap()
        },
        |pair: &Pair, _: &()| {
            let flip = pair.flip.replace(!pair.flip.get());
            let mut dependents = Dependents::new();
            if flip {
                dependents.insert("b", &pair.b);
                dependents.insert("a", &pair.a);
            } else {
                dependents.insert("a", &pair.a);
                dependents.insert("b", &pair.b);
            }
            dependents
        },
    );

    let pair = Pair { a: Rc::new(1), b: Rc::new(2), flip: Cell::new(false) };
    test!(miss: sum.call(&pair, ()), Some(3));
    test!(hit: sum.call(&pair, ()), Some(3));
    test!(hit: sum.call(&pair, ()), Some(3));
    assert_eq!(calls.get(), 1);
}

/// Test that complex arguments are reported but still work.
#[test]
fn test_warns_against_complex_arguments() {
    let tally = Tally::default();
    let state = State::new([]);

    tally.selector(|_: &Posts, _: &(i32,)| ()).call(&state, (1,));
    tally.selector(|_: &Posts, _: &(&'static str,)| ()).call(&state, ("",));
    tally.selector(|_: &Posts, _: &(&'static str,)| ()).call(&state, ("foo",));
    tally.selector(|_: &Posts, _: &(bool,)| ()).call(&state, (true,));
    tally.selector(|_: &Posts, _: &(Option<u8>,)| ()).call(&state, (None,));
    tally.selector(|_: &Posts, _: &((),)| ()).call(&state, ((),));
    tally
        .selector(|_: &Posts, _: &(BTreeMap<u8, u8>,)| ())
        .call(&state, (BTreeMap::new(),));
    tally.selector(|_: &Posts, _: &(Vec<u8>,)| ()).call(&state, (vec![],));
    let mixed = tally.selector(|_: &Posts, _: &(i32, Vec<u8>)| ());
    test!(miss: mixed.call(&state, (1, vec![])), Some(()));

    assert_eq!(tally.warnings(), [Warning::ComplexArguments; 3]);
    assert_eq!(tally.calls(), 9);
}

/// Test that arguments with the same coercion share an entry.
#[test]
fn test_signature_collision() {
    let tally = Tally::default();
    let describe = tally.selector(|_: &Posts, (label,): &(Option<&'static str>,)| {
        label.unwrap_or("nothing")
    });
    let state = State::new([POST1]);
    test!(miss: describe.call(&state, (None,)), Some("nothing"));
    test!(hit: describe.call(&state, (Some(""),)), Some("nothing"));
    test!(miss: describe.call(&state, (Some("x"),)), Some("x"));
}

/// Test that the deriver sees the state and the arguments.
#[test]
fn test_deriver_arguments() {
    let seen = Rc::new(RefCell::new(vec![]));
    let log = seen.clone();
    let selector = memoselect::create(
        |_: &Dependents, _: &(u8, u8, u8)| (),
        move |state: &State, args: &(u8, u8, u8)| {
            log.borrow_mut().push((state.posts.len(), *args));
            dependents! { posts: &state.posts }
        },
    );

    let state = State::new([]);
    selector.call(&state, (1, 2, 3));
    selector.call(&state, (1, 2, 3));
    assert_eq!(*seen.borrow(), [(0, (1, 2, 3)), (0, (1, 2, 3))]);
}

/// Test that a missing compute function fails construction.
#[test]
fn test_missing_compute() {
    let result = Selector::<State, (), ()>::builder()
        .dependents(|state: &State, _: &()| dependents! { posts: &state.posts })
        .build();
    assert_eq!(result.unwrap_err(), InvalidArgumentError::MissingCompute);
}

/// Test that a missing deriver fails construction.
#[test]
fn test_missing_dependents() {
    let result = Selector::<State, (), ()>::builder()
        .compute(|_: &Dependents, _: &()| ())
        .build();
    assert_eq!(result.unwrap_err(), InvalidArgumentError::MissingDependents);
}

/// Test that a primitive from the deriver is reported.
#[test]
fn test_primitive_dependents() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let warnings = Rc::new(RefCell::new(vec![]));
    let sink = warnings.clone();
    let selector = Selector::builder()
        .compute(move |_: &Dependents, _: &()| counter.set(counter.get() + 1))
        .dependents(|_: &(), _: &()| 5)
        .sink(move |warning: &Warning| sink.borrow_mut().push(*warning))
        .build()
        .unwrap();

    test!(miss: selector.call(&(), ()), None);
    assert_eq!(*warnings.borrow(), [Warning::InvalidDependents]);
    assert_eq!(calls.get(), 0);
    assert!(selector.is_empty());
}

/// Test that empty dependents are reported.
#[test]
fn test_empty_dependents() {
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let warnings = Rc::new(RefCell::new(vec![]));
    let sink = warnings.clone();
    let selector = Selector::builder()
        .compute(move |_: &Dependents, _: &()| counter.set(counter.get() + 1))
        .dependents(|_: &State, _: &()| Dependents::new())
        .sink(move |warning: &Warning| sink.borrow_mut().push(*warning))
        .build()
        .unwrap();

    assert_eq!(selector.call(&State::new([POST1]), ()), None);
    assert_eq!(*warnings.borrow(), [Warning::InvalidDependents]);
    assert_eq!(calls.get(), 0);
}

/// Test that both warnings are reported for a call with both problems.
#[test]
fn test_both_warnings() {
    let warnings = Rc::new(RefCell::new(vec![]));
    let sink = warnings.clone();
    let selector = Selector::builder()
        .compute(|_: &Dependents, _: &(Vec<u8>,)| ())
        .dependents(|_: &(), _: &(Vec<u8>,)| None::<Dependents>)
        .sink(move |warning: &Warning| sink.borrow_mut().push(*warning))
        .build()
        .unwrap();

    assert_eq!(selector.call(&(), (vec![1],)), None);
    assert_eq!(
        *warnings.borrow(),
        [Warning::ComplexArguments, Warning::InvalidDependents]
    );
}

/// Test that the stock sinks plug into the builder.
#[test]
fn test_stock_sinks() {
    for sink in [memoselect::diagnostics::stderr, memoselect::diagnostics::ignore] {
        let selector = Selector::builder()
            .compute(|_: &Dependents, _: &(Vec<u8>,)| 1)
            .dependents(|state: &State, _: &(Vec<u8>,)| dependents! { posts: &state.posts })
            .sink(sink)
            .build()
            .unwrap();

        let state = State::new([POST1]);
        test!(miss: selector.call(&state, (vec![1],)), Some(1));
        test!(hit: selector.call(&state, (vec![1],)), Some(1));
    }
}

/// Test that panics propagate and leave nothing behind.
#[test]
fn test_panic_propagates() {
    let tally = Tally::default();
    let fragile = tally.selector(|posts: &Posts, &(fail,): &(bool,)| {
        if fail {
            panic!("compute failed");
        }
        posts.len()
    });

    let state = State::new([POST1]);
    let result = panic::catch_unwind(AssertUnwindSafe(|| fragile.call(&state, (true,))));
    assert!(result.is_err());
    assert!(fragile.is_empty());
    test!(miss: fragile.call(&state, (false,)), Some(1));
    test!(hit: fragile.call(&state, (false,)), Some(1));
    assert_eq!(tally.calls(), 2);
}

/// Test deriving dependents from a struct.
#[test]
fn test_derive() {
    #[derive(memoselect::Dependents)]
    struct PostDependents {
        posts: Rc<Posts>,
        r#type: Rc<&'static str>,
    }

    let kind = Rc::new("blog");
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    let describe = memoselect::create(
        move |deps: &Dependents, _: &()| {
            counter.set(counter.get() + 1);
            let names: Vec<_> = deps.iter().map(|(name, _)| name.to_string()).collect();
            let posts = deps.get_ref::<Posts>("posts").unwrap().len();
            let kind = *deps.get_ref::<&str>("type").unwrap();
            (names, format!("{posts} {kind} posts"))
        },
        move |state: &State, _: &()| PostDependents {
            posts: state.posts.clone(),
            r#type: kind.clone(),
        },
    );

    let state = State::new([POST1, POST2]);
    let expected = (vec!["posts".to_string(), "type".to_string()], "2 blog posts".to_string());
    test!(miss: describe.call(&state, ()), Some(expected.clone()));
    test!(hit: describe.call(&state, ()), Some(expected));
    assert_eq!(calls.get(), 1);
}
