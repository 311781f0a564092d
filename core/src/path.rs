//! URL construction for FluidDB resources.
//!
//! A path is either a pre-joined string (`/users/test`) or a list of raw
//! segments (`["about", "an/- object", "test", "foo"]`). Every segment is
//! percent-encoded on its own, so a `/` inside a segment becomes `%2F` and is
//! never read as a separator. Non-ASCII text is encoded byte-wise from its
//! UTF-8 form with upper-case hex digits.

use urlencoding::encode;

/// A resource path on a FluidDB instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// A slash-delimited path such as `/objects/<id>/test/tag`.
    Joined(String),
    /// Raw segments, joined with `/` after encoding.
    Segments(Vec<String>),
}

impl Path {
    /// The encoded path, starting with `/`, or empty for an empty path.
    ///
    /// A joined path keeps its structure: only a leading `/` is taken as the
    /// root, so empty interior and trailing segments survive.
    pub fn encode(&self) -> String {
        let encoded: Vec<String> = match self {
            Path::Joined(path) if path.is_empty() => Vec::new(),
            Path::Joined(path) => path
                .strip_prefix('/')
                .unwrap_or(path)
                .split('/')
                .map(|segment| encode(segment).into_owned())
                .collect(),
            Path::Segments(segments) => segments
                .iter()
                .map(|segment| encode(segment).into_owned())
                .collect(),
        };
        if encoded.is_empty() {
            return String::new();
        }
        format!("/{}", encoded.join("/"))
    }
}

impl From<&str> for Path {
    fn from(path: &str) -> Self {
        Path::Joined(path.to_string())
    }
}

impl From<String> for Path {
    fn from(path: String) -> Self {
        Path::Joined(path)
    }
}

impl From<Vec<String>> for Path {
    fn from(segments: Vec<String>) -> Self {
        Path::Segments(segments)
    }
}

impl From<Vec<&str>> for Path {
    fn from(segments: Vec<&str>) -> Self {
        Path::Segments(segments.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Path {
    fn from(segments: &[&str]) -> Self {
        Path::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Path {
    fn from(segments: [&str; N]) -> Self {
        Path::Segments(segments.iter().map(|s| s.to_string()).collect())
    }
}

/// A query parameter value. Lists repeat the key once per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::One(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::One(value.to_string())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::Many(values)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(values: Vec<&str>) -> Self {
        QueryValue::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Join an instance root, an encoded path and an optional query string.
///
/// Query parameters keep their insertion order and are form-encoded, so a
/// space becomes `+` and `/` becomes `%2F`.
pub fn build_url(instance: &str, path: &Path, query: &[(String, QueryValue)]) -> String {
    let mut target = format!("{}{}", instance.trim_end_matches('/'), path.encode());
    if query.is_empty() {
        return target;
    }

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in query {
        match value {
            QueryValue::One(value) => {
                serializer.append_pair(name, value);
            }
            QueryValue::Many(values) => {
                for value in values {
                    serializer.append_pair(name, value);
                }
            }
        }
    }
    target.push('?');
    target.push_str(&serializer.finish());
    target
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE: &str = "https://fluiddb.fluidinfo.com";

    #[test]
    fn segment_slashes_and_spaces_are_escaped() {
        let path = Path::from(["about", "an/- object", "test", "foo"]);
        assert_eq!(
            build_url(INSTANCE, &path, &[]),
            format!("{INSTANCE}/about/an%2F-%20object/test/foo")
        );
    }

    #[test]
    fn joined_path_keeps_separators() {
        let path = Path::from("/users/test");
        assert_eq!(build_url(INSTANCE, &path, &[]), format!("{INSTANCE}/users/test"));
    }

    #[test]
    fn joined_path_keeps_empty_segments() {
        assert_eq!(Path::from("/namespaces/test/").encode(), "/namespaces/test/");
        assert_eq!(Path::from("/a//b").encode(), "/a//b");
        assert_eq!(Path::from("users/test").encode(), "/users/test");
        assert_eq!(Path::from("/").encode(), "/");
    }

    #[test]
    fn non_ascii_is_encoded_bytewise() {
        let path = Path::from("/users/Cüäh");
        assert_eq!(
            build_url(INSTANCE, &path, &[]),
            format!("{INSTANCE}/users/C%C3%BC%C3%A4h")
        );
    }

    #[test]
    fn empty_path_yields_instance() {
        assert_eq!(build_url(INSTANCE, &Path::from(""), &[]), INSTANCE);
        assert_eq!(build_url(INSTANCE, &Path::Segments(Vec::new()), &[]), INSTANCE);
    }

    #[test]
    fn trailing_slash_on_instance_is_stripped() {
        let url = build_url("http://localhost:3000/", &Path::from("/users/test"), &[]);
        assert_eq!(url, "http://localhost:3000/users/test");
    }

    #[test]
    fn list_query_values_repeat_the_key() {
        let query = vec![
            ("tag".to_string(), QueryValue::from(vec!["fluiddb/about", "test/ns/tag"])),
            ("query".to_string(), QueryValue::from("has test/ns/tag")),
        ];
        let url = build_url(INSTANCE, &Path::from("/values"), &query);
        assert_eq!(
            url,
            format!(
                "{INSTANCE}/values?tag=fluiddb%2Fabout&tag=test%2Fns%2Ftag&query=has+test%2Fns%2Ftag"
            )
        );
    }

    #[test]
    fn boolean_query_value() {
        let query = vec![("returnDescription".to_string(), QueryValue::from(true))];
        let url = build_url(INSTANCE, &Path::from("/namespaces/test"), &query);
        assert_eq!(url, format!("{INSTANCE}/namespaces/test?returnDescription=true"));
    }
}
