use crate::data::Headers;
use std::collections::BTreeMap;

/// Immutable snapshot of the state a chain carries from a response into the
/// requests that depend on it.
///
/// A snapshot is never modified: capturing headers from a response produces a
/// new snapshot layered over the parent's, so concurrent chains and sibling
/// requests can never observe each other's values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    base_url: String,
    values: BTreeMap<String, String>,
}

impl SessionContext {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves `path` against the base URL.
    pub fn url<S: AsRef<str>>(&self, path: S) -> String {
        let path = path.as_ref();
        if path.starts_with("http://") || path.starts_with("https://") || self.base_url.is_empty() {
            return String::from(path);
        }

        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<&str> {
        self.values
            .get(&name.as_ref().to_lowercase())
            .map(String::as_str)
    }

    /// The captured cookies, ready to be sent back as a `Cookie` header.
    pub fn cookie(&self) -> Option<&str> {
        self.get("set-cookie")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn with_value<S1: AsRef<str>, S2: Into<String>>(&self, name: S1, value: S2) -> Self {
        let mut values = self.values.clone();
        values.insert(name.as_ref().to_lowercase(), value.into());

        Self {
            base_url: self.base_url.clone(),
            values,
        }
    }

    /// Builds the snapshot handed to a request's continuation: this snapshot
    /// overlaid with the designated headers found in `headers`. Designated
    /// headers missing from the response keep their inherited value.
    pub fn derive<S: AsRef<str>>(&self, headers: &Headers, designated: &[S]) -> Self {
        let mut values = self.values.clone();

        for name in designated {
            let name = name.as_ref().to_lowercase();
            if let Some(value) = capture_header(headers, &name) {
                values.insert(name, value);
            }
        }

        Self {
            base_url: self.base_url.clone(),
            values,
        }
    }
}

fn capture_header(headers: &Headers, name: &str) -> Option<String> {
    let captured: Vec<&str> = if name == "set-cookie" {
        // only the name=value pair of each cookie goes back to the server
        headers
            .get_all(name)
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect()
    } else {
        headers.get_all(name).collect()
    };

    match captured.len() {
        0 => None,
        _ if name == "set-cookie" => Some(captured.join("; ")),
        _ => Some(captured.join(", ")),
    }
}
