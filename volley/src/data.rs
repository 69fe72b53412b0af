use hyper::body::Bytes;
use std::iter::FromIterator;

/// Header list with case-insensitive names. Names are stored lower-cased and
/// repeated headers (like `set-cookie`) keep every value in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn append<S1: AsRef<str>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.entries
            .push((name.as_ref().to_lowercase(), value.into()));
    }

    /// Replaces every value of `name` with `value`.
    pub fn insert<S1: AsRef<str>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        let name = name.as_ref().to_lowercase();
        self.entries.retain(|(key, _)| *key != name);
        self.entries.push((name, value.into()));
    }

    pub fn get<S: AsRef<str>>(&self, name: S) -> Option<&str> {
        self.get_all(name).next()
    }

    pub fn get_all<S: AsRef<str>>(&self, name: S) -> impl Iterator<Item = &str> {
        let name = name.as_ref().to_lowercase();
        self.entries
            .iter()
            .filter(move |(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains<S: AsRef<str>>(&self, name: S) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.append(key, value);
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestData {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseData {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl ResponseData {
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_ignore_header_name_case() {
        let headers: Headers = vec![("Content-Type", "text/html; charset=utf-8")]
            .into_iter()
            .collect();

        assert_eq!(headers.get("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html; charset=utf-8"));
        assert!(!headers.contains("accept"));
    }

    #[test]
    fn repeated_headers_keep_every_value() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1; Path=/");
        headers.append("set-cookie", "b=2");

        assert_eq!(
            headers.get_all("SET-COOKIE").collect::<Vec<_>>(),
            vec!["a=1; Path=/", "b=2"]
        );

        headers.insert("Set-Cookie", "c=3");
        assert_eq!(headers.get_all("set-cookie").collect::<Vec<_>>(), vec!["c=3"]);
        assert_eq!(headers.len(), 1);
    }
}
