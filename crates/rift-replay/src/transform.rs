//! Composable rewriting of [`ResponseData`].
//!
//! A [`ResponseDataTransform`] collects body, content-type and header steps
//! and applies them, in the order they were added, when
//! [`ResponseDataTransform::transform`] is called. The source value is only
//! read, never modified.

use crate::model::{ByteSource, MediaType, ResponseData};

pub type HeaderPair = (String, String);
pub type HeaderIter = std::vec::IntoIter<HeaderPair>;

type BodyStep<'a> = Box<dyn FnOnce(ByteSource) -> ByteSource + 'a>;
type ContentTypeStep<'a> = Box<dyn FnOnce(MediaType) -> MediaType + 'a>;
type HeaderStep<'a> = Box<dyn FnOnce(Vec<HeaderPair>) -> Vec<HeaderPair> + 'a>;

/// Builder of a transformed copy of a [`ResponseData`].
pub struct ResponseDataTransform<'a> {
    original: &'a ResponseData,
    body_steps: Vec<BodyStep<'a>>,
    content_type_steps: Vec<ContentTypeStep<'a>>,
    header_steps: Vec<HeaderStep<'a>>,
}

impl ResponseData {
    /// Start building a transformed copy of this value.
    pub fn transform(&self) -> ResponseDataTransform<'_> {
        ResponseDataTransform {
            original: self,
            body_steps: Vec::new(),
            content_type_steps: Vec::new(),
            header_steps: Vec::new(),
        }
    }
}

impl<'a> ResponseDataTransform<'a> {
    pub fn map_body<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ByteSource) -> ByteSource + 'a,
    {
        self.body_steps.push(Box::new(f));
        self
    }

    pub fn map_content_type<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MediaType) -> MediaType + 'a,
    {
        self.content_type_steps.push(Box::new(f));
        self
    }

    /// Rewrite the header sequence as a whole.
    pub fn map_headers<F, I>(mut self, f: F) -> Self
    where
        F: FnOnce(HeaderIter) -> I + 'a,
        I: IntoIterator<Item = HeaderPair>,
    {
        self.header_steps
            .push(Box::new(move |headers: Vec<HeaderPair>| {
                f(headers.into_iter()).into_iter().collect()
            }));
        self
    }

    /// Keep only the headers for which `predicate(name, value)` holds.
    pub fn filter_headers<P>(self, predicate: P) -> Self
    where
        P: Fn(&str, &str) -> bool + 'a,
    {
        self.map_headers(move |headers| {
            headers.filter(move |(name, value)| predicate(name.as_str(), value.as_str()))
        })
    }

    /// Remove every header called `name` (case-insensitive) and append one with `value`.
    pub fn replace_header(self, name: &str, value: &str) -> Self {
        let name = name.to_string();
        let value = value.to_string();
        self.map_headers(move |headers| {
            headers
                .filter(|(n, _)| !n.eq_ignore_ascii_case(&name))
                .chain(std::iter::once((name.clone(), value)))
                .collect::<Vec<_>>()
        })
    }

    /// Replace the typed content type and the `Content-Type` header together.
    pub fn replace_content_type(self, media_type: MediaType) -> Self {
        let header_value = media_type.to_string();
        self.map_content_type(move |_| media_type)
            .replace_header("Content-Type", &header_value)
    }

    /// Apply all accumulated steps and produce the new value.
    pub fn transform(self) -> ResponseData {
        let original = self.original;
        let body = self
            .body_steps
            .into_iter()
            .fold(original.body().clone(), |body, step| step(body));
        let content_type = self
            .content_type_steps
            .into_iter()
            .fold(original.content_type().clone(), |ct, step| step(ct));
        let headers = self
            .header_steps
            .into_iter()
            .fold(original.headers().to_vec(), |headers, step| step(headers));
        ResponseData::new(headers, Some(content_type), body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sample() -> ResponseData {
        ResponseData::new(
            vec![
                ("Content-Type".to_string(), "text/plain".to_string()),
                ("X-A".to_string(), "1".to_string()),
                ("x-a".to_string(), "2".to_string()),
                ("Cache-Control".to_string(), "no-cache".to_string()),
            ],
            MediaType::parse("text/plain"),
            ByteSource::from("hello"),
        )
    }

    #[test]
    fn test_original_is_untouched() {
        let original = sample();
        let changed = original
            .transform()
            .map_body(|_| ByteSource::from("bye"))
            .replace_header("X-A", "3")
            .transform();

        assert_eq!(&original.read_body().unwrap()[..], b"hello");
        assert_eq!(original.header_values("x-a").count(), 2);
        assert_eq!(&changed.read_body().unwrap()[..], b"bye");
        let values: Vec<_> = changed.header_values("x-a").collect();
        assert_eq!(values, vec!["3"]);
    }

    #[test]
    fn test_replace_header_appends_single_value() {
        let changed = sample().transform().replace_header("x-a", "9").transform();
        let names: Vec<_> = changed.headers().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Content-Type", "Cache-Control", "x-a"]);
    }

    #[test]
    fn test_steps_compose_in_order() {
        let changed = sample()
            .transform()
            .map_body(|body| {
                let mut text = body.open().unwrap().to_vec();
                text.extend_from_slice(b" one");
                ByteSource::from(text)
            })
            .map_body(|body| {
                let mut text = body.open().unwrap().to_vec();
                text.extend_from_slice(b" two");
                ByteSource::from(text)
            })
            .transform();
        assert_eq!(changed.read_body().unwrap(), Bytes::from_static(b"hello one two"));
    }

    #[test]
    fn test_replace_content_type_updates_field_and_header() {
        let json = MediaType::parse("application/json; charset=utf-8").unwrap();
        let changed = sample().transform().replace_content_type(json.clone()).transform();
        assert_eq!(changed.content_type(), &json);
        let values: Vec<_> = changed.header_values("content-type").collect();
        assert_eq!(values, vec!["application/json; charset=utf-8"]);
    }

    #[test]
    fn test_filter_headers() {
        let changed = sample()
            .transform()
            .filter_headers(|name, _| !name.eq_ignore_ascii_case("cache-control"))
            .transform();
        assert!(changed.first_header("Cache-Control").is_none());
        assert_eq!(changed.headers().len(), 3);
    }

    #[test]
    fn test_map_headers_stream() {
        let changed = sample()
            .transform()
            .map_headers(|headers| headers.map(|(n, v)| (n.to_uppercase(), v)))
            .transform();
        assert_eq!(changed.headers()[0].0, "CONTENT-TYPE");
    }
}
