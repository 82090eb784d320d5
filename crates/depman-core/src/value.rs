//! Sentinel-carrying optional value injected into components

/// A value that is either present or a well-defined absent sentinel.
///
/// Unresolved optional dependencies inject [`Value::Absent`] rather than
/// leaving a slot untouched, so a component always sees a definite value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value<T> {
    Present(T),
    #[default]
    Absent,
}

impl<T> Value<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Value::Present(_))
    }

    pub fn is_absent(&self) -> bool {
        !self.is_present()
    }

    pub fn as_ref(&self) -> Value<&T> {
        match self {
            Value::Present(v) => Value::Present(v),
            Value::Absent => Value::Absent,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Value<U> {
        match self {
            Value::Present(v) => Value::Present(f(v)),
            Value::Absent => Value::Absent,
        }
    }

    /// Returns the contained value or `fallback` when absent
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            Value::Present(v) => v,
            Value::Absent => fallback,
        }
    }

    /// Falls back to `other` when this value is absent
    pub fn or(self, other: Value<T>) -> Value<T> {
        match self {
            Value::Present(_) => self,
            Value::Absent => other,
        }
    }

    pub fn into_option(self) -> Option<T> {
        self.into()
    }
}

impl<T> From<Option<T>> for Value<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Value::Present(v),
            None => Value::Absent,
        }
    }
}

impl<T> From<Value<T>> for Option<T> {
    fn from(value: Value<T>) -> Self {
        match value {
            Value::Present(v) => Some(v),
            Value::Absent => None,
        }
    }
}
