//! Inputs to account resolution.
//!
//! Every input is optional and supplied by the calling layer; resolution never
//! fetches anything on its own.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde_json::{Map, Value};

/// Named attribute lookup on a domain entity (a customer, an order, ...).
///
/// Only string values count; anything else is treated as absent.
pub trait AttributeSource: Send + Sync {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl<S: BuildHasher + Send + Sync> AttributeSource for HashMap<String, String, S> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for Map<String, Value> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).and_then(Value::as_str).map(str::to_owned)
    }
}

/// Everything a resolver may look at for one unit of work.
///
/// Header names are matched case-insensitively; route and query names are
/// matched exactly.
#[derive(Default)]
pub struct ResolutionRequest<'a> {
    entity: Option<&'a dyn AttributeSource>,
    route_params: HashMap<String, String>,
    query_params: HashMap<String, String>,
    headers: HashMap<String, String>,
}

impl<'a> ResolutionRequest<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request carrying only a domain entity, as used by billing calls.
    #[must_use]
    pub fn for_entity(entity: &'a dyn AttributeSource) -> Self {
        Self::new().with_entity(entity)
    }

    #[must_use]
    pub fn with_entity(mut self, entity: &'a dyn AttributeSource) -> Self {
        self.entity = Some(entity);
        self
    }

    #[must_use]
    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.route_params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_route_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.route_params.extend(params);
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    /// Parse an `application/x-www-form-urlencoded` query string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid urlencoded data.
    pub fn with_query_string(mut self, query: &str) -> Result<Self, serde_urlencoded::de::Error> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
        self.query_params.extend(pairs);
        Ok(self)
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn entity(&self) -> Option<&'a dyn AttributeSource> {
        self.entity
    }

    #[must_use]
    pub fn route_param(&self, name: &str) -> Option<&str> {
        self.route_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Query parameter, falling back to the header when the parameter is absent.
    ///
    /// A present-but-empty query parameter wins over the header, the same way
    /// a web framework's `query(name, default)` behaves.
    #[must_use]
    pub fn query_or_header(&self, param: &str, header: &str) -> Option<&str> {
        self.query_param(param).or_else(|| self.header(header))
    }
}

impl std::fmt::Debug for ResolutionRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionRequest")
            .field("has_entity", &self.entity.is_some())
            .field("route_params", &self.route_params)
            .field("query_params", &self.query_params)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .finish()
    }
}
