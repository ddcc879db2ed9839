use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

static STATES_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#directoryAutoInsuranceStatesSmall").unwrap());
static CITIES_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.directoryListingContainer").unwrap());
static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// State page links on the directory root, or `None` if the states container is absent.
pub fn state_links(html: &str, base: &Url) -> Option<Vec<String>> {
    links_in(html, base, &STATES_SEL)
}

/// City page links on a state page, or `None` if the listing container is absent.
pub fn city_links(html: &str, base: &Url) -> Option<Vec<String>> {
    links_in(html, base, &CITIES_SEL)
}

// Only the first matching container is read.
fn links_in(html: &str, base: &Url, container: &Selector) -> Option<Vec<String>> {
    let document = Html::parse_document(html);
    let container = document.select(container).next()?;

    let links = container
        .select(&LINK_SEL)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(String::from)
        .collect();
    Some(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://www.valuepenguin.com/auto-insurance").unwrap()
    }

    #[test]
    fn root_page_states() {
        let html = std::fs::read_to_string("tests/fixtures/directory_root.html").unwrap();
        let states = state_links(&html, &base()).unwrap();
        assert_eq!(
            states,
            vec![
                "http://www.valuepenguin.com/auto-insurance/illinois",
                "http://www.valuepenguin.com/auto-insurance/new-york",
            ]
        );
    }

    #[test]
    fn state_page_cities() {
        let html = std::fs::read_to_string("tests/fixtures/state_page.html").unwrap();
        let state = Url::parse("http://www.valuepenguin.com/auto-insurance/illinois").unwrap();
        let cities = city_links(&html, &state).unwrap();
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0], "http://www.valuepenguin.com/auto-insurance/illinois/oak-park");
    }

    #[test]
    fn missing_container() {
        assert!(state_links("<html><body></body></html>", &base()).is_none());
    }
}
