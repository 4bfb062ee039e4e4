//! Deserializing repeated elements.
//!
//! A response element that occurs once is parsed as a single value and only
//! becomes an array from the second occurrence on. Fields declared with
//! `maxOccurs="unbounded"` should use [`one_or_many`]:
//!
//! ```
//! #[derive(serde::Deserialize)]
//! struct Page {
//!     #[serde(default, deserialize_with = "admanager::soap::repeated::one_or_many")]
//!     results: Vec<String>,
//! }
//! ```
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Accepts a single value, an array or null as a `Vec`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::soap::envelope::parse_response;

    #[derive(Deserialize, Debug, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Page {
        total_result_set_size: String,
        #[serde(default, deserialize_with = "one_or_many")]
        results: Vec<Item>,
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Item {
        id: String,
        name: String,
    }

    fn page(xml_results: &str, total: usize) -> Page {
        let xml = format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body><getItemsByStatementResponse><rval><totalResultSetSize>{total}</totalResultSetSize>{xml_results}</rval></getItemsByStatementResponse></soap:Body></soap:Envelope>"#
        );
        let mut response = parse_response(&xml).unwrap();
        serde_json::from_value(response["rval"].take()).unwrap()
    }

    fn item(id: &str, name: &str) -> Item {
        Item {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_single_result() {
        let page = page("<results><id>1</id><name>only</name></results>", 1);
        assert_eq!("1", page.total_result_set_size);
        assert_eq!(vec![item("1", "only")], page.results);
    }

    #[test]
    fn test_many_results() {
        let page = page(
            "<results><id>1</id><name>a</name></results><results><id>2</id><name>b</name></results>",
            2,
        );
        assert_eq!(vec![item("1", "a"), item("2", "b")], page.results);
    }

    #[test]
    fn test_no_results() {
        assert!(page("", 0).results.is_empty());
    }

    #[test]
    fn test_scalars_and_null() {
        #[derive(Deserialize)]
        struct Ids {
            #[serde(deserialize_with = "one_or_many")]
            ids: Vec<String>,
        }
        let ids: Ids = serde_json::from_value(json!({"ids": "7"})).unwrap();
        assert_eq!(vec!["7"], ids.ids);
        let ids: Ids = serde_json::from_value(json!({"ids": ["7", "8"]})).unwrap();
        assert_eq!(vec!["7", "8"], ids.ids);
        let ids: Ids = serde_json::from_value(json!({"ids": null})).unwrap();
        assert!(ids.ids.is_empty());
    }
}
