// ── Hierarchical query keys ──
//
// A key is an ordered sequence of structurally-compared segments. Prefix
// matching is the basis for hierarchical invalidation: invalidating
// ("coins",) hits ("coins","balance") and ("coins","transactions",{page}).

use std::collections::BTreeMap;
use std::fmt;

/// One segment of a [`QueryKey`].
///
/// Segments compare structurally (deep equality), never by identity.
/// `Params` is an ordered map so two parameter sets with the same pairs
/// are always equal regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuerySegment {
    Text(String),
    Num(i64),
    Params(BTreeMap<String, String>),
}

impl From<&str> for QuerySegment {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for QuerySegment {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for QuerySegment {
    fn from(value: i64) -> Self {
        Self::Num(value)
    }
}

impl From<u32> for QuerySegment {
    fn from(value: u32) -> Self {
        Self::Num(i64::from(value))
    }
}

impl fmt::Display for QuerySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Num(n) => write!(f, "{n}"),
            Self::Params(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// An ordered, finite sequence of segments identifying one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueryKey(Vec<QuerySegment>);

impl QueryKey {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a text segment.
    pub fn text(mut self, segment: impl Into<String>) -> Self {
        self.0.push(QuerySegment::Text(segment.into()));
        self
    }

    /// Append a numeric segment.
    pub fn num(mut self, segment: i64) -> Self {
        self.0.push(QuerySegment::Num(segment));
        self
    }

    /// Append a parameter-map segment.
    pub fn params<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        let map = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        self.0.push(QuerySegment::Params(map));
        self
    }

    pub fn segments(&self) -> &[QuerySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Prefix rule: `prefix` matches `self` iff every segment of `prefix`
    /// equals the corresponding leading segment of `self`. Trailing
    /// segments of `self` are ignored, so a shorter key matches every
    /// key that extends it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.0.len() <= self.0.len()
            && prefix.0.iter().zip(self.0.iter()).all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{seg}")?;
        }
        write!(f, ")")
    }
}

impl FromIterator<QuerySegment> for QueryKey {
    fn from_iter<I: IntoIterator<Item = QuerySegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Key factory for one feature, producing the conventional
/// `(feature, "list"|"detail", params?|id?)` namespace.
///
/// Callers must use this shape (or the equivalent hand-built keys) for
/// prefix invalidation to fan out correctly: `all()` covers every key the
/// factory produces, `lists()` covers every `list(...)` key, and so on.
#[derive(Debug, Clone)]
pub struct QueryKeys {
    feature: String,
}

impl QueryKeys {
    pub fn new(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
        }
    }

    /// `(feature,)` — matches every query in the feature.
    pub fn all(&self) -> QueryKey {
        QueryKey::new().text(self.feature.clone())
    }

    /// `(feature, "list")` — matches all list-type queries.
    pub fn lists(&self) -> QueryKey {
        self.all().text("list")
    }

    /// `(feature, "list", params)` — one list query filtered by params.
    pub fn list<K, V>(&self, params: impl IntoIterator<Item = (K, V)>) -> QueryKey
    where
        K: Into<String>,
        V: ToString,
    {
        self.lists().params(params)
    }

    /// `(feature, "detail")` — matches all detail-type queries.
    pub fn details(&self) -> QueryKey {
        self.all().text("detail")
    }

    /// `(feature, "detail", id)` — a single detail query.
    pub fn detail(&self, id: impl Into<String>) -> QueryKey {
        self.details().text(id)
    }
}
