use std::collections::HashMap;

/// A single name/value query argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestArgument {
    name: String,
    value: String,
}

impl RequestArgument {
    /// Creates an argument.
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }

    /// The argument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argument value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Ordered list of query arguments passed to a call.
///
/// Names are not required to be unique. Duplicates are preserved in order;
/// [`to_map`](Self::to_map) resolves them last-wins.
///
/// ```rust
/// use service_transport::RequestArguments;
///
/// let args = RequestArguments::new()
///     .with("userId", 1)
///     .with("page", 2);
///
/// assert_eq!(args.as_query(), vec![("userId", "1"), ("page", "2")]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArguments {
    items: Vec<RequestArgument>,
}

impl RequestArguments {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument, builder style.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.push(RequestArgument::new(name, value));
        self
    }

    /// Appends an argument.
    pub fn push(&mut self, argument: RequestArgument) {
        self.items.push(argument);
    }

    /// Iterates over the arguments in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, RequestArgument> {
        self.items.iter()
    }

    /// Number of arguments, duplicates included.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Flattens the list to a mapping; a repeated name keeps its last value.
    pub fn to_map(&self) -> HashMap<&str, &str> {
        self.items
            .iter()
            .map(|arg| (arg.name(), arg.value()))
            .collect()
    }

    /// Ordered `(name, value)` pairs, suitable for a query string.
    pub fn as_query(&self) -> Vec<(&str, &str)> {
        self.items
            .iter()
            .map(|arg| (arg.name(), arg.value()))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestArguments
where
    K: Into<String>,
    V: ToString,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            items: iter
                .into_iter()
                .map(|(name, value)| RequestArgument::new(name, value))
                .collect(),
        }
    }
}

impl FromIterator<RequestArgument> for RequestArguments {
    fn from_iter<I: IntoIterator<Item = RequestArgument>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RequestArguments {
    type Item = &'a RequestArgument;
    type IntoIter = std::slice::Iter<'a, RequestArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for RequestArguments {
    type Item = RequestArgument;
    type IntoIter = std::vec::IntoIter<RequestArgument>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
