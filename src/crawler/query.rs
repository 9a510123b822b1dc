//! Logical API queries
//!
//! A `Query` names one paginated resource collection: an endpoint relative to
//! the API base URL plus its query parameters, in the order they were added.

/// One logical paginated request against the upstream API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    endpoint: String,
    params: Vec<(String, String)>,
}

impl Query {
    /// Creates a query for an endpoint such as `orgs/octo/repos`
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_start_matches('/').to_string(),
            params: Vec::new(),
        }
    }

    /// Adds or replaces a query parameter
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        let name = name.into();
        let value = value.to_string();
        match self.params.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value,
            None => self.params.push((name, value)),
        }
        self
    }

    /// Adds a parameter only if it is not already set
    pub fn param_or(self, name: &str, value: impl ToString) -> Self {
        if self.get(name).is_some() {
            self
        } else {
            self.param(name, value)
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Returns the value of a parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Parameters for one page of this query
    ///
    /// Page 1 is requested without a `page` parameter, the way the API's own
    /// first link is formed.
    pub fn page_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params = self.params.clone();
        if page > 1 {
            params.retain(|(k, _)| k != "page");
            params.push(("page".to_string(), page.to_string()));
        }
        params
    }
}
