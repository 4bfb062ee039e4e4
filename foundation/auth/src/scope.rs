use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// Scopes understood by the Ad Manager token endpoint.
///
/// The registry is closed: any other name or URL is rejected when the
/// credential is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Full access to the SOAP API.
    Dfp,
    /// Access to the REST API.
    AdManager,
}

const REGISTRY: [(Scope, &str, &str); 2] = [
    (Scope::Dfp, "DFP", "https://www.googleapis.com/auth/dfp"),
    (Scope::AdManager, "ADMANAGER", "https://www.googleapis.com/auth/admanager"),
];

impl Scope {
    pub fn name(&self) -> &'static str {
        REGISTRY.iter().find(|(s, _, _)| s == self).map(|(_, n, _)| *n).unwrap_or_default()
    }

    pub fn url(&self) -> &'static str {
        REGISTRY.iter().find(|(s, _, _)| s == self).map(|(_, _, u)| *u).unwrap_or_default()
    }

    /// Resolves every entry, failing on the first unknown one.
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Scope>, Error> {
        names.iter().map(|s| s.as_ref().parse()).collect()
    }

    pub(crate) fn join(scopes: &[Scope], sep: &str) -> String {
        scopes.iter().map(|s| s.url()).collect::<Vec<_>>().join(sep)
    }
}

impl FromStr for Scope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REGISTRY
            .iter()
            .find(|(_, name, url)| name.eq_ignore_ascii_case(s) || *url == s)
            .map(|(scope, _, _)| *scope)
            .ok_or_else(|| Error::UnknownScope(s.to_string()))
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url())
    }
}
