//! User credentials carried by every client request

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Header carrying the requesting user name
pub const USER_HEADER: &str = "x-testcluster-user";

/// Header carrying the comma-separated group list
pub const GROUPS_HEADER: &str = "x-testcluster-groups";

/// Identity of the test user (immutable once built)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    username: String,
    groups: BTreeSet<String>,
}

impl Credentials {
    pub fn new<I, S>(username: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            username: username.into(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    /// The fixed identity every test cluster uses
    pub fn test_user() -> Self {
        Self::new("ClientTest", ["ClientTest"])
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    /// First group in sort order, used as the owning group of new files
    pub fn primary_group(&self) -> Option<&str> {
        self.groups.iter().next().map(String::as_str)
    }

    pub fn groups_header_value(&self) -> String {
        self.groups.iter().cloned().collect::<Vec<_>>().join(",")
    }

    /// Extract credentials sent by a client. `None` if no user header is present.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let username = headers.get(USER_HEADER)?.to_str().ok()?.trim();
        if username.is_empty() {
            return None;
        }
        let groups = headers
            .get(GROUPS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Some(Self::new(username, groups))
    }
}
