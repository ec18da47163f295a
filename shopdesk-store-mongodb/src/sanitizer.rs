//! Key sanitization for MongoDB compatibility.
//!
//! MongoDB rejects document keys containing dots or a leading dollar sign, and both
//! can legitimately appear in keys of free-form content (for example a `links` map).
//! Keys are escaped on the way in and restored on the way out. String values are
//! stored untouched so equality filters keep working.

use bson::Bson;

pub(crate) struct ValueSanitizer;

impl ValueSanitizer {
    const REPLACEMENTS: [(&'static str, &'static str); 3] = [
        (".", "__dot__"),
        ("$", "__dollar__"),
        ("\0", "__null__"),
    ];

    /// Recursively escapes the keys of every nested document.
    pub(crate) fn sanitize_value(value: &Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr.iter()
                    .map(Self::sanitize_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (Self::sanitize_string(k), Self::sanitize_value(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .fold(input.to_string(), |acc, (target, replacement)| acc.replace(target, replacement))
    }

    /// Inverse of [`ValueSanitizer::sanitize_value`].
    pub(crate) fn restore_value(value: &Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr.iter()
                    .map(Self::restore_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (Self::restore_string(k), Self::restore_value(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    pub(crate) fn restore_string(input: &str) -> String {
        Self::REPLACEMENTS
            .iter()
            .rev()
            .fold(input.to_string(), |acc, (target, replacement)| acc.replace(replacement, target))
    }
}

#[cfg(test)]
mod tests {
    use bson::doc;

    use super::*;

    #[test]
    fn escapes_keys_but_not_values() {
        let original = Bson::Document(doc! {
            "links": { "example.com": "https://example.com/$path" },
        });

        let sanitized = ValueSanitizer::sanitize_value(&original);
        let links = sanitized.as_document().unwrap().get_document("links").unwrap();

        assert_eq!(links.get_str("example__dot__com").unwrap(), "https://example.com/$path");
        assert_eq!(ValueSanitizer::restore_value(&sanitized), original);
    }
}
