use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::rc::Rc;

use crate::signature::Signature;

/// A single argument to a memoized selector.
///
/// Arguments are keyed by their string coercion. Primitives coerce
/// losslessly. Sequences and maps are _complex_: they still coerce (elements
/// comma-joined, maps to `[object Object]`), but they make distinct calls
/// collide easily, so the selector warns whenever one is passed.
pub trait Argument {
    /// Append the string coercion of the argument.
    fn coerce(&self, out: &mut String);

    /// Whether this is a complex (object-like) argument.
    fn is_complex(&self) -> bool {
        false
    }
}

macro_rules! display_argument {
    ($($ty:ty),* $(,)?) => {
        $(impl Argument for $ty {
            #[inline]
            fn coerce(&self, out: &mut String) {
                let _ = write!(out, "{self}");
            }
        })*
    };
}

display_argument! {
    bool, char, str, String,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
}

macro_rules! float_argument {
    ($($ty:ty),*) => {
        $(impl Argument for $ty {
            fn coerce(&self, out: &mut String) {
                let magnitude = self.abs();
                if self.is_infinite() {
                    out.push_str(if *self > 0.0 { "Infinity" } else { "-Infinity" });
                } else if *self == 0.0 {
                    // Negative zero coerces like positive zero.
                    out.push('0');
                } else if magnitude >= 1e21 || magnitude < 1e-6 {
                    exponential(&format!("{self:e}"), out);
                } else {
                    let _ = write!(out, "{self}");
                }
            }
        })*
    };
}

float_argument!(f32, f64);

/// Write a float in exponent form with an explicitly signed exponent.
fn exponential(formatted: &str, out: &mut String) {
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            let _ = write!(out, "{mantissa}e+{exponent}");
        }
        _ => out.push_str(formatted),
    }
}

/// The absent argument. Coerces to the empty string.
impl Argument for () {
    #[inline]
    fn coerce(&self, _: &mut String) {}
}

impl<T: Argument> Argument for Option<T> {
    fn coerce(&self, out: &mut String) {
        if let Some(value) = self {
            value.coerce(out);
        }
    }

    fn is_complex(&self) -> bool {
        self.as_ref().is_some_and(Argument::is_complex)
    }
}

impl<T: Argument + ?Sized> Argument for &T {
    #[inline]
    fn coerce(&self, out: &mut String) {
        (**self).coerce(out);
    }

    #[inline]
    fn is_complex(&self) -> bool {
        (**self).is_complex()
    }
}

impl<T: Argument + ?Sized> Argument for Box<T> {
    #[inline]
    fn coerce(&self, out: &mut String) {
        (**self).coerce(out);
    }

    #[inline]
    fn is_complex(&self) -> bool {
        (**self).is_complex()
    }
}

impl<T: Argument + ?Sized> Argument for Rc<T> {
    #[inline]
    fn coerce(&self, out: &mut String) {
        (**self).coerce(out);
    }

    #[inline]
    fn is_complex(&self) -> bool {
        (**self).is_complex()
    }
}

impl<T: Argument> Argument for [T] {
    fn coerce(&self, out: &mut String) {
        for (i, item) in self.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            item.coerce(out);
        }
    }

    fn is_complex(&self) -> bool {
        true
    }
}

impl<T: Argument, const N: usize> Argument for [T; N] {
    fn coerce(&self, out: &mut String) {
        self.as_slice().coerce(out);
    }

    fn is_complex(&self) -> bool {
        true
    }
}

impl<T: Argument> Argument for Vec<T> {
    fn coerce(&self, out: &mut String) {
        self.as_slice().coerce(out);
    }

    fn is_complex(&self) -> bool {
        true
    }
}

impl<K, V, S> Argument for HashMap<K, V, S> {
    fn coerce(&self, out: &mut String) {
        out.push_str(OBJECT);
    }

    fn is_complex(&self) -> bool {
        true
    }
}

impl<K, V> Argument for BTreeMap<K, V> {
    fn coerce(&self, out: &mut String) {
        out.push_str(OBJECT);
    }

    fn is_complex(&self) -> bool {
        true
    }
}

/// How object-like arguments coerce.
const OBJECT: &str = "[object Object]";

/// The variadic arguments of a selector call, passed as a tuple.
///
/// This is implemented for tuples of up to twelve [`Argument`]s, including
/// the empty tuple.
pub trait Arguments {
    /// The arguments as a list, in order.
    fn to_list(&self) -> Vec<&dyn Argument>;

    /// Join the coerced arguments with commas.
    fn signature(&self) -> Signature {
        let mut out = String::new();
        self.to_list().as_slice().coerce(&mut out);
        Signature::new(out)
    }

    /// Whether any argument is complex.
    fn any_complex(&self) -> bool {
        self.to_list().iter().any(|arg| arg.is_complex())
    }
}

macro_rules! tuple_arguments {
    ($($param:tt $idx:tt),*) => {
        impl<$($param: Argument),*> Arguments for ($($param,)*) {
            fn to_list(&self) -> Vec<&dyn Argument> {
                vec![$(&self.$idx as &dyn Argument),*]
            }
        }
    };
}

tuple_arguments! {}
tuple_arguments! { A 0 }
tuple_arguments! { A 0, B 1 }
tuple_arguments! { A 0, B 1, C 2 }
tuple_arguments! { A 0, B 1, C 2, D 3 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10 }
tuple_arguments! { A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7, I 8, J 9, K 10, L 11 }
