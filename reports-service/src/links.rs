//! Hypermedia links: per-item parent links and `prev`/`next` pagination.

use service_core::error::AppError;

use crate::params::base_name;

/// Joins `base_url` and an absolute route path without doubling slashes.
pub fn rest_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// `collection_url` with the original query pairs, in order, and `page`
/// overwritten (or appended when absent). `page[]` counts as `page`.
pub fn page_url(
    collection_url: &str,
    query_pairs: &[(String, String)],
    page: u32,
) -> Result<String, AppError> {
    let mut pairs: Vec<(&str, String)> = Vec::with_capacity(query_pairs.len() + 1);
    let mut replaced = false;

    for (key, value) in query_pairs {
        if base_name(key) == "page" {
            if !replaced {
                pairs.push(("page", page.to_string()));
                replaced = true;
            }
        } else {
            pairs.push((key.as_str(), value.clone()));
        }
    }
    if !replaced {
        pairs.push(("page", page.to_string()));
    }

    let query = serde_urlencoded::to_string(&pairs).map_err(|e| {
        AppError::InternalError(anyhow::anyhow!("Failed to encode pagination link: {}", e))
    })?;
    Ok(format!("{}?{}", collection_url, query))
}

/// `prev` is present iff `page_no > 1` and never points outside
/// `[1, max(pages, 1)]`; `next` is present iff `pages > page_no`.
pub fn pagination_links(
    collection_url: &str,
    query_pairs: &[(String, String)],
    page_no: u32,
    pages: u32,
) -> Result<Vec<(&'static str, String)>, AppError> {
    let mut links = Vec::new();

    if page_no > 1 {
        let prev_page = (page_no - 1).min(pages).max(1);
        links.push(("prev", page_url(collection_url, query_pairs, prev_page)?));
    }
    if pages > page_no {
        links.push(("next", page_url(collection_url, query_pairs, page_no + 1)?));
    }

    Ok(links)
}

/// RFC 5988 `Link` header value.
pub fn link_header_value(rel: &str, url: &str) -> String {
    format!("<{}>; rel=\"{}\"", url, rel)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = "http://shop.test/wc/v3/reports/products";

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn rest_url_normalises_slashes() {
        assert_eq!(
            rest_url("http://shop.test/", "/wc/v3/products/4"),
            "http://shop.test/wc/v3/products/4"
        );
        assert_eq!(
            rest_url("http://shop.test", "wc/v3"),
            "http://shop.test/wc/v3"
        );
    }

    #[test]
    fn middle_page_has_prev_and_next() {
        let pairs = query(&[
            ("page", "2"),
            ("per_page", "5"),
            ("orderby", "gross_revenue"),
            ("order", "asc"),
        ]);
        let links = pagination_links(COLLECTION, &pairs, 2, 3).unwrap();

        assert_eq!(
            links,
            vec![
                (
                    "prev",
                    format!("{}?page=1&per_page=5&orderby=gross_revenue&order=asc", COLLECTION)
                ),
                (
                    "next",
                    format!("{}?page=3&per_page=5&orderby=gross_revenue&order=asc", COLLECTION)
                ),
            ]
        );
    }

    #[test]
    fn first_page_has_only_next() {
        let links = pagination_links(COLLECTION, &[], 1, 3).unwrap();
        assert_eq!(links, vec![("next", format!("{}?page=2", COLLECTION))]);
    }

    #[test]
    fn last_page_has_only_prev() {
        let links = pagination_links(COLLECTION, &query(&[("page", "3")]), 3, 3).unwrap();
        assert_eq!(links, vec![("prev", format!("{}?page=2", COLLECTION))]);
    }

    #[test]
    fn prev_is_clamped_past_the_end() {
        let links = pagination_links(COLLECTION, &query(&[("page", "9")]), 9, 3).unwrap();
        assert_eq!(links, vec![("prev", format!("{}?page=3", COLLECTION))]);

        // no pages at all: prev still lands on a real page
        let links = pagination_links(COLLECTION, &query(&[("page", "4")]), 4, 0).unwrap();
        assert_eq!(links, vec![("prev", format!("{}?page=1", COLLECTION))]);
    }

    #[test]
    fn single_page_has_no_links() {
        assert!(pagination_links(COLLECTION, &[], 1, 1).unwrap().is_empty());
        assert!(pagination_links(COLLECTION, &[], 1, 0).unwrap().is_empty());
    }

    #[test]
    fn other_params_are_preserved_and_encoded() {
        let pairs = query(&[("categories[]", "3"), ("categories[]", "7"), ("page", "1")]);
        let url = page_url(COLLECTION, &pairs, 2).unwrap();
        assert_eq!(
            url,
            format!("{}?categories%5B%5D=3&categories%5B%5D=7&page=2", COLLECTION)
        );
    }

    #[test]
    fn bracketed_page_key_is_replaced() {
        let pairs = query(&[("page[]", "1"), ("per_page", "5"), ("page[0]", "4")]);
        assert_eq!(
            page_url(COLLECTION, &pairs, 2).unwrap(),
            format!("{}?page=2&per_page=5", COLLECTION)
        );
    }

    #[test]
    fn link_header_is_rfc5988() {
        assert_eq!(
            link_header_value("next", "http://shop.test/x?page=2"),
            "<http://shop.test/x?page=2>; rel=\"next\""
        );
    }
}
