use std::fmt;
use std::rc::Rc;

/// A requested state transition: either a replacement value or a pure
/// function of the previous state.
pub enum Action<S> {
    Replace(S),
    Apply(Rc<dyn Fn(&S) -> S>),
}

impl<S> Action<S> {
    pub fn apply(f: impl Fn(&S) -> S + 'static) -> Self {
        Action::Apply(Rc::new(f))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Action::Apply(_))
    }
}

impl<S> From<S> for Action<S> {
    fn from(value: S) -> Self {
        Action::Replace(value)
    }
}

impl<S: Clone> Clone for Action<S> {
    fn clone(&self) -> Self {
        match self {
            Action::Replace(value) => Action::Replace(value.clone()),
            Action::Apply(f) => Action::Apply(Rc::clone(f)),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Action::Apply(_) => f.write_str("Apply(..)"),
        }
    }
}

/// Function actions are applied to the state, literal actions replace it.
pub fn basic_reducer<S: Clone>(state: &S, action: &Action<S>) -> S {
    match action {
        Action::Replace(value) => value.clone(),
        Action::Apply(f) => f(state),
    }
}

/// Reducer a queue was last resolved with. The state hook only ever uses
/// [`Reducer::Basic`]; the tag lets cached eager results be matched against
/// the reducer a later resolution runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    #[default]
    Basic,
}

impl Reducer {
    pub fn reduce<S: Clone>(self, state: &S, action: &Action<S>) -> S {
        match self {
            Reducer::Basic => basic_reducer(state, action),
        }
    }
}
