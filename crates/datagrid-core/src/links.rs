use std::collections::HashMap;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::GridError;

/// Characters left as-is inside a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Named-route URL generation handed to action link builders.
///
/// Routes are patterns with `{param}` placeholders, e.g. `/stations/{id}/edit`.
#[derive(Debug, Clone, Default)]
pub struct LinkContext {
    base_url: String,
    routes: HashMap<String, String>,
}

impl LinkContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            routes: HashMap::new(),
        }
    }

    pub fn with_route(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.routes.insert(name.into(), pattern.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Expand route `name`, percent-encoding each parameter as a path segment.
    pub fn generate(&self, name: &str, params: &[(&str, &str)]) -> Result<String, GridError> {
        let pattern = self
            .routes
            .get(name)
            .ok_or_else(|| GridError::configuration(format!("unknown route {name}")))?;

        let mut out = String::with_capacity(self.base_url.len() + pattern.len());
        out.push_str(&self.base_url);
        let mut rest = pattern.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let end = rest[start..].find('}').ok_or_else(|| {
                GridError::configuration(format!("unterminated placeholder in route {name}"))
            })? + start;
            let key = &rest[start + 1..end];
            let value = params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    GridError::configuration(format!("route {name} requires parameter {key}"))
                })?;
            out.extend(utf8_percent_encode(value, SEGMENT));
            rest = &rest[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
