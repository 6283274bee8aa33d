//! Ordered parameter storage for built statements.

use crate::value::Value;

/// The parameters of one statement, in placeholder order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamList {
    params: Vec<Value>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based index.
    pub fn push(&mut self, value: impl Into<Value>) -> usize {
        self.params.push(value.into());
        self.params.len()
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.params
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.params
    }

    /// Append another list's parameters after this one's.
    pub fn extend(&mut self, other: ParamList) {
        self.params.extend(other.params);
    }
}

impl From<Vec<Value>> for ParamList {
    fn from(params: Vec<Value>) -> Self {
        Self { params }
    }
}

/// Anything usable as the parameter half of a `(template, params)` WHERE.
///
/// A single scalar becomes a one-element list; tuples, vectors and
/// [`ParamList`]s keep their order.
pub trait IntoParams {
    fn into_params(self) -> ParamList;
}

impl IntoParams for ParamList {
    fn into_params(self) -> ParamList {
        self
    }
}

impl IntoParams for Vec<Value> {
    fn into_params(self) -> ParamList {
        ParamList::from(self)
    }
}

impl IntoParams for () {
    fn into_params(self) -> ParamList {
        ParamList::new()
    }
}

impl<T: Into<Value>> IntoParams for Option<T> {
    fn into_params(self) -> ParamList {
        ParamList::from(vec![Value::from(self)])
    }
}

macro_rules! impl_scalar_into_params {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoParams for $ty {
                fn into_params(self) -> ParamList {
                    ParamList::from(vec![Value::from(self)])
                }
            }
        )*
    };
}

impl_scalar_into_params!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    &str,
    String,
    &String,
    Vec<u8>,
    &[u8],
    serde_json::Value,
    chrono::NaiveDateTime,
    chrono::NaiveDate,
);

macro_rules! impl_tuple_into_params {
    ($($name:ident),+) => {
        impl<$($name: Into<Value>),+> IntoParams for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_params(self) -> ParamList {
                let ($($name,)+) = self;
                ParamList::from(vec![$($name.into()),+])
            }
        }
    };
}

impl_tuple_into_params!(A);
impl_tuple_into_params!(A, B);
impl_tuple_into_params!(A, B, C);
impl_tuple_into_params!(A, B, C, D);
impl_tuple_into_params!(A, B, C, D, E);
impl_tuple_into_params!(A, B, C, D, E, F);
