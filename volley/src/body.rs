use hyper::body::Bytes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Display;

lazy_static! {
    static ref JSON_MEDIA_TYPE: Regex = Regex::new(r"^application/([a-z0-9.+-]+\+)?json$").unwrap();
    static ref PATH_SEGMENT: Regex = Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").unwrap();
    static ref PATH_INDEX: Regex = Regex::new(r"\[(\d+)\]").unwrap();
}

/// A response body after content negotiation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Empty,
    Json(Value),
    Text(String),
    Binary(Bytes),
    /// The content type promised structure but the payload could not be parsed.
    Malformed(String),
}

impl ParsedBody {
    pub fn is_malformed(&self) -> bool {
        matches!(self, ParsedBody::Malformed(_))
    }

    pub fn as_json(&self) -> Result<BodyValue<'_>, ShapeError> {
        match self {
            ParsedBody::Json(value) => Ok(BodyValue::root(value)),
            ParsedBody::Malformed(reason) => Err(ShapeError::new("$", reason.clone())),
            other => Err(ShapeError::new(
                "$",
                format!("expected a JSON body, got {}", other.kind()),
            )),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ParsedBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParsedBody::Empty => "an empty body",
            ParsedBody::Json(_) => "a JSON body",
            ParsedBody::Text(_) => "a text body",
            ParsedBody::Binary(_) => "a binary body",
            ParsedBody::Malformed(_) => "a malformed body",
        }
    }
}

/// Parses `bytes` according to the media type of `content_type`.
pub fn parse(content_type: Option<&str>, bytes: &Bytes) -> ParsedBody {
    if bytes.is_empty() {
        return ParsedBody::Empty;
    }

    let media_type = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_lowercase())
        .unwrap_or_default();

    if JSON_MEDIA_TYPE.is_match(&media_type) {
        match serde_json::from_slice(bytes) {
            Ok(value) => ParsedBody::Json(value),
            Err(e) => ParsedBody::Malformed(format!("invalid JSON body: {}", e)),
        }
    } else if media_type.starts_with("text/") {
        ParsedBody::Text(String::from_utf8_lossy(bytes).into())
    } else {
        ParsedBody::Binary(bytes.clone())
    }
}

/// A shape mismatch found while reading a structured body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub path: String,
    pub reason: String,
}

impl ShapeError {
    pub fn new<S1: Into<String>, S2: Into<String>>(path: S1, reason: S2) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl std::error::Error for ShapeError {}

impl Display for ShapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "at {}: {}", self.path, self.reason)
    }
}

/// Read-only view into a JSON body. Every accessor checks the shape it
/// expects and reports the offending path instead of panicking.
#[derive(Debug, Clone)]
pub struct BodyValue<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> BodyValue<'a> {
    pub fn root(value: &'a Value) -> Self {
        Self {
            value,
            path: String::from("$"),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw(&self) -> &'a Value {
        self.value
    }

    pub fn field(&self, name: &str) -> Result<BodyValue<'a>, ShapeError> {
        let object = self
            .value
            .as_object()
            .ok_or_else(|| self.mismatch("an object"))?;
        let path = format!("{}.{}", self.path, name);

        match object.get(name) {
            Some(value) => Ok(BodyValue { value, path }),
            None => Err(ShapeError::new(path, "field is missing")),
        }
    }

    pub fn index(&self, index: usize) -> Result<BodyValue<'a>, ShapeError> {
        let array = self.as_array()?;
        let path = format!("{}[{}]", self.path, index);

        match array.get(index) {
            Some(value) => Ok(BodyValue { value, path }),
            None => Err(ShapeError::new(
                path,
                format!("index out of bounds (length {})", array.len()),
            )),
        }
    }

    /// Follows a dotted path such as `stages[0].icon`.
    pub fn at(&self, path: &str) -> Result<BodyValue<'a>, ShapeError> {
        let mut current = self.clone();

        for segment in path.split('.').filter(|segment| !segment.is_empty()) {
            let captures = PATH_SEGMENT
                .captures(segment)
                .ok_or_else(|| {
                    let reason = format!("invalid path segment '{}'", segment);
                    ShapeError::new(current.path.clone(), reason)
                })?;

            let name = captures.get(1).map_or("", |m| m.as_str());
            if !name.is_empty() {
                current = current.field(name)?;
            }

            let indices = captures.get(2).map_or("", |m| m.as_str());
            for index in PATH_INDEX.captures_iter(indices) {
                let index = index[1].parse::<usize>().map_err(|e| {
                    ShapeError::new(current.path.clone(), format!("invalid index: {}", e))
                })?;
                current = current.index(index)?;
            }
        }

        Ok(current)
    }

    pub fn as_array(&self) -> Result<&'a Vec<Value>, ShapeError> {
        self.value.as_array().ok_or_else(|| self.mismatch("an array"))
    }

    pub fn as_str(&self) -> Result<&'a str, ShapeError> {
        self.value.as_str().ok_or_else(|| self.mismatch("a string"))
    }

    pub fn as_u64(&self) -> Result<u64, ShapeError> {
        self.value
            .as_u64()
            .ok_or_else(|| self.mismatch("an unsigned integer"))
    }

    pub fn as_bool(&self) -> Result<bool, ShapeError> {
        self.value.as_bool().ok_or_else(|| self.mismatch("a boolean"))
    }

    /// Length of an array, object or string.
    pub fn len(&self) -> Result<usize, ShapeError> {
        match self.value {
            Value::Array(array) => Ok(array.len()),
            Value::Object(object) => Ok(object.len()),
            Value::String(string) => Ok(string.chars().count()),
            _ => Err(self.mismatch("an array, object or string")),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ShapeError> {
        T::deserialize(self.value).map_err(|e| ShapeError::new(self.path.clone(), e.to_string()))
    }

    fn mismatch(&self, expected: &str) -> ShapeError {
        ShapeError::new(
            self.path.clone(),
            format!("expected {}, found {}", expected, json_kind(self.value)),
        )
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
