//! Token scopes and repository names
//!
//! A scope is `<resourceType>:<resourceName>:<action>`, e.g.
//! `repository:library/alpine:pull`. Repository names are checked against the
//! distribution name grammar before they are used in a scope or a URL.

use crate::error::ScopeError;
use std::fmt;
use std::str::FromStr;

const MAX_NAME_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    resource_type: String,
    resource_name: String,
    action: String,
}

/// Compose a scope from its three parts. Only emptiness is checked.
pub fn build_scope(
    resource_type: &str,
    resource_name: &str,
    action: &str,
) -> Result<Scope, ScopeError> {
    if resource_type.is_empty() {
        return Err(ScopeError::EmptyComponent("resource type"));
    }
    if resource_name.is_empty() {
        return Err(ScopeError::EmptyComponent("resource name"));
    }
    if action.is_empty() {
        return Err(ScopeError::EmptyComponent("action"));
    }

    Ok(Scope {
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        action: action.to_string(),
    })
}

impl Scope {
    /// `registry:catalog:*`, the scope for listing every repository.
    pub fn catalog() -> Self {
        Scope {
            resource_type: "registry".to_string(),
            resource_name: "catalog".to_string(),
            action: "*".to_string(),
        }
    }

    /// `repository:<name>:pull`
    pub fn pull(repository: &RepositoryName) -> Self {
        Scope {
            resource_type: "repository".to_string(),
            resource_name: repository.as_str().to_string(),
            action: "pull".to_string(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.resource_type, self.resource_name, self.action)
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [resource_type, resource_name, action] => {
                build_scope(resource_type, resource_name, action)
            }
            _ => Err(ScopeError::Malformed(s.to_string())),
        }
    }
}

/// A repository name accepted by the registry, e.g. `library/alpine`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(String);

impl RepositoryName {
    pub fn parse(name: &str) -> Result<Self, String> {
        if name.is_empty() {
            return Err("name is empty".to_string());
        }
        if name.len() > MAX_NAME_LENGTH {
            return Err(format!("name exceeds {} characters", MAX_NAME_LENGTH));
        }
        for component in name.split('/') {
            validate_component(component)?;
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// component := alnum+ (separator alnum+)*
// separator := "." | "_" | "__" | "-"+
fn validate_component(component: &str) -> Result<(), String> {
    if component.is_empty() {
        return Err("empty path component".to_string());
    }

    let bytes = component.as_bytes();
    let is_alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();

    if !is_alnum(bytes[0]) || !is_alnum(bytes[bytes.len() - 1]) {
        return Err(format!(
            "component '{}' must start and end with a lowercase letter or digit",
            component
        ));
    }

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if is_alnum(b) {
            i += 1;
            continue;
        }

        let run_start = i;
        while i < bytes.len() && !is_alnum(bytes[i]) {
            i += 1;
        }
        let separator = &component[run_start..i];
        let valid = separator == "."
            || separator == "_"
            || separator == "__"
            || separator.bytes().all(|c| c == b'-');
        if !valid {
            return Err(format!(
                "invalid separator '{}' in component '{}'",
                separator, component
            ));
        }
    }

    Ok(())
}
