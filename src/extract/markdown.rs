//! HTML to Markdown conversion.

use scraper::{Html, Selector};

/// Convert HTML to Markdown, falling back to plain text if conversion fails.
pub fn html_to_markdown(html: &str) -> String {
    htmd::convert(html).unwrap_or_else(|_| {
        let document = Html::parse_document(html);
        document.root_element().text().collect::<String>()
    })
}

/// Document `<title>`, empty if absent.
pub fn page_title(html: &str) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_keeps_headings_and_text() {
        let md = html_to_markdown("<h1>Precios</h1><p>Acetaminofén <strong>500mg</strong></p>");
        assert!(md.contains("Precios"));
        assert!(!md.contains("<h1>"));
        assert!(md.contains("**500mg**"));
    }

    #[test]
    fn test_page_title() {
        assert_eq!(
            page_title("<html><head><title> Cruz Verde </title></head></html>"),
            "Cruz Verde"
        );
        assert_eq!(page_title("<p>no title</p>"), "");
    }
}
