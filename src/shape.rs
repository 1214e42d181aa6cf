use crate::dependent::Dependents;

/// A value a dependents deriver may return.
///
/// Derivers are caller-defined, so their output is only validated at the
/// selector boundary: anything that is not object-like yields `None` and the
/// call degrades to a warning. Primitive types implement this trait so that
/// such derivers still type-check and can be diagnosed at run time.
///
/// Structs whose fields all convert into a [`Dependent`](crate::Dependent)
/// can implement it with [`#[derive(Dependents)]`](macro@crate::Dependents).
pub trait Shape {
    /// The named dependents, if the value is object-like.
    fn into_dependents(self) -> Option<Dependents>;
}

impl Shape for Dependents {
    #[inline]
    fn into_dependents(self) -> Option<Dependents> {
        Some(self)
    }
}

impl Shape for Option<Dependents> {
    #[inline]
    fn into_dependents(self) -> Option<Dependents> {
        self
    }
}

macro_rules! primitive_shape {
    ($($ty:ty),* $(,)?) => {
        $(impl Shape for $ty {
            #[inline]
            fn into_dependents(self) -> Option<Dependents> {
                None
            }
        })*
    };
}

primitive_shape! {
    (), bool, char, String, &str,
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    f32, f64,
}

/// Whether a derived value is object-like and holds at least one dependent.
pub(crate) fn validate<D: Shape>(derived: D) -> Option<Dependents> {
    derived.into_dependents().filter(|dependents| !dependents.is_empty())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn test_primitives_are_rejected() {
        assert!(validate(5).is_none());
        assert!(validate(()).is_none());
        assert!(validate("posts").is_none());
        assert!(validate(None::<Dependents>).is_none());
    }

    #[test]
    fn test_empty_is_rejected() {
        assert!(validate(Dependents::new()).is_none());
        assert!(validate(Some(Dependents::new())).is_none());
    }

    #[test]
    fn test_non_empty_passes() {
        let posts = Rc::new(0u32);
        let dependents = validate(crate::dependents! { posts: &posts });
        assert_eq!(dependents.map(|d| d.len()), Some(1));
    }
}
