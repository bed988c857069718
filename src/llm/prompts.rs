//! Default prompts for structured extraction.

/// Query used when the caller does not supply one.
pub const DEFAULT_PRODUCT_QUERY: &str = r#"Extract the product information as a JSON object with this structure:

{
    "name": "",
    "brand": "",
    "price": "",
    "presentation": "",
    "description": "",
    "image": "",
    "availability": ""
}

Use an empty string for anything the page does not state. Keep prices and text in the page's original language and formatting."#;

/// Wrapper prompt; `{query}` and `{content}` are substituted.
pub const DEFAULT_EXTRACTION_PROMPT: &str = r#"You extract structured data from web pages.

{query}

Page content (markdown):
---
{content}
---

Respond with a single JSON object and nothing else."#;
