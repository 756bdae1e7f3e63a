//! Store element attributes and their values.

use std::slice;

/// Name/value pairs for the attributes of a filter element.
///
/// Names are kept as written, including any namespace prefix like `xlink:`.  The order of
/// the attributes is preserved, so that a repeated attribute overrides the earlier ones
/// when the element walks through them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    attrs: Box<[(String, String)]>,
}

/// Iterator from `Attributes.iter`.
pub struct AttributesIter<'a>(slice::Iter<'a, (String, String)>);

impl Attributes {
    pub fn new() -> Attributes {
        Attributes::default()
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Creates an iterator that yields `(&str, &str)` tuples.
    pub fn iter(&self) -> AttributesIter<'_> {
        AttributesIter(self.attrs.iter())
    }

    /// Value of the last attribute called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().filter(|(n, _)| *n == name).map(|(_, v)| v).last()
    }
}

impl<'a> Iterator for AttributesIter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Attributes
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Attributes {
            attrs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

/// Whether `name` is an `href` attribute, with or without the `xlink:` prefix.
pub fn is_href(name: &str) -> bool {
    name == "href" || name == "xlink:href"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_order() {
        let attrs: Attributes = [("in", "SourceGraphic"), ("result", "blur")]
            .into_iter()
            .collect();

        assert_eq!(attrs.len(), 2);

        let v: Vec<_> = attrs.iter().collect();
        assert_eq!(v, vec![("in", "SourceGraphic"), ("result", "blur")]);
    }

    #[test]
    fn last_attribute_wins() {
        let attrs: Attributes = [("dx", "1"), ("dx", "2")].into_iter().collect();
        assert_eq!(attrs.get("dx"), Some("2"));
        assert_eq!(attrs.get("dy"), None);
    }

    #[test]
    fn recognizes_href() {
        assert!(is_href("href"));
        assert!(is_href("xlink:href"));
        assert!(!is_href("src"));
    }
}
