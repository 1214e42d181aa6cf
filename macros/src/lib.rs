extern crate proc_macro;

macro_rules! bail {
    ($item:expr, $fmt:literal $($tts:tt)*) => {
        return Err(Error::new_spanned(
            &$item,
            format!(concat!("memoselect: ", $fmt) $($tts)*)
        ))
    }
}

mod dependents;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Error, Result};

/// Derive `Shape` for a struct of dependents.
///
/// Every field becomes one dependent, named after the field. Field types
/// must convert into a `Dependent`, e.g. `Rc<T>`.
///
/// ```ignore
/// #[derive(Dependents)]
/// struct PostDependents {
///     posts: Rc<Posts>,
///     users: Rc<Users>,
/// }
///
/// let selector = memoselect::create(
///     |deps: &Dependents, _: &()| count(deps),
///     |state: &State, _: &()| PostDependents {
///         posts: state.posts.clone(),
///         users: state.users.clone(),
///     },
/// );
/// ```
#[proc_macro_derive(Dependents)]
pub fn dependents(stream: TokenStream) -> TokenStream {
    let item = syn::parse_macro_input!(stream as syn::DeriveInput);
    dependents::expand(&item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
