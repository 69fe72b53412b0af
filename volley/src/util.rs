use crate::{data::Headers, error::Error};
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};

pub fn extract_headers(header_map: &HeaderMap) -> Headers {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (k.as_str(), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<Headers>()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}
