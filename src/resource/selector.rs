use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::ResourceError;
use crate::Result;

/// Group/version/resource triple identifying a watched collection.
///
/// The core API group is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceId {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl ResourceId {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            resource: resource.into(),
        }
    }

    /// Builds coordinates from an `apiVersion` string and a plural resource name
    pub fn from_api_version(
        api_version: &str,
        resource: impl Into<String>,
    ) -> Result<Self> {
        let (group, version) = parse_group_version(api_version)?;
        Ok(Self::new(group, version, resource))
    }

    /// Identifier used as the log prefix of a controller: `group/version/resource`
    pub fn controller_id(&self) -> String {
        format!("{}/{}/{}", self.group, self.version, self.resource)
    }

    /// `apiVersion` form: `version` for the core group, `group/version` otherwise
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.controller_id())
    }
}

/// Splits `v1` into `("", "v1")` and `apps/v1` into `("apps", "v1")`
pub fn parse_group_version(api_version: &str) -> Result<(String, String)> {
    let trimmed = api_version.trim();
    let mut parts = trimmed.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(version), None, None) if !version.is_empty() => Ok((String::new(), version.to_string())),
        (Some(group), Some(version), None) if !group.is_empty() && !version.is_empty() => {
            Ok((group.to_string(), version.to_string()))
        }
        _ => Err(ResourceError::InvalidGroupVersion(api_version.to_string()).into()),
    }
}

/// Namespace include/exclude filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceSelector {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl NamespaceSelector {
    /// Keeps namespaces named in `include` (all when empty), then drops the
    /// ones named in `exclude`. Input order is preserved.
    pub fn filter(
        &self,
        namespaces: &[String],
    ) -> Vec<String> {
        namespaces
            .iter()
            .filter(|ns| self.include.is_empty() || self.include.contains(ns))
            .filter(|ns| !self.exclude.contains(ns))
            .cloned()
            .collect()
    }
}

/// Query description for a set of objects of one kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Namespaces skipped by [`ResourceQuery::query`](crate::ResourceQuery::query)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

impl Selector {
    /// `k1=v1,k2=v2` in key order; empty when no labels are set
    pub fn label_selector(&self) -> String {
        self.labels
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn group_version(&self) -> Result<(String, String)> {
        parse_group_version(&self.api_version)
    }
}
