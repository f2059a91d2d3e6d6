use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const SCHEME: &str = "at://";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed at-uri '{uri}': {reason}")]
pub struct AtUriError {
    pub uri: String,
    pub reason: &'static str,
}

/// A record address of the form `at://{authority}/{collection}/{rkey}`.
///
/// The authority is either a DID or a handle. Only record-level uris are
/// accepted; repo- or collection-level uris are rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    pub authority: String,
    pub collection: String,
    pub rkey: String,
}

impl FromStr for AtUri {
    type Err = AtUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| AtUriError {
            uri: s.to_string(),
            reason,
        };

        let rest = s.strip_prefix(SCHEME).ok_or_else(|| fail("missing at:// scheme"))?;
        let mut parts = rest.split('/');
        let (authority, collection, rkey) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(c), Some(r)) => (a, c, r),
            _ => return Err(fail("expected {authority}/{collection}/{rkey}")),
        };
        if parts.next().is_some() {
            return Err(fail("trailing path segments"));
        }
        if authority.is_empty() || collection.is_empty() || rkey.is_empty() {
            return Err(fail("empty path segment"));
        }

        Ok(AtUri {
            authority: authority.to_string(),
            collection: collection.to_string(),
            rkey: rkey.to_string(),
        })
    }
}

impl fmt::Display for AtUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}/{}", self.authority, self.collection, self.rkey)
    }
}
