//! Small helpers over `scraper` shared by the HTML scrapers.

use anyhow::{Result, anyhow};
use scraper::{ElementRef, Selector};

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

/// All text under `element`, whitespace collapsed.
pub fn text_of(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of the first descendant matching `sel`, if it has any.
pub fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(text_of).filter(|t| !t.is_empty())
}

/// The text nodes under `element` as non-empty lines, whitespace collapsed.
pub fn lines_of(element: ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .flat_map(str::lines)
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn text_is_collapsed_and_lines_split() {
        let doc = Html::parse_fragment(
            "<div class=\"d\">\n  Farmacia   Centro <br>✆ 4700-0000\n<span>Abierta</span></div>",
        );
        let div = doc.select(&selector("div.d").unwrap()).next().unwrap();

        assert_eq!(text_of(div), "Farmacia Centro ✆ 4700-0000 Abierta");
        assert_eq!(lines_of(div), ["Farmacia Centro", "✆ 4700-0000", "Abierta"]);
        assert_eq!(first_text(div, &selector("span").unwrap()).as_deref(), Some("Abierta"));
        assert_eq!(first_text(div, &selector("p").unwrap()), None);
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(selector("td[").is_err());
    }
}
