//! HTML → plain-text payload extraction.
//!
//! Two strategies:
//! - a targeted CSS selector (e.g. `div#acalog-course-preview` on catalog
//!   detail pages), falling back to the whole document when it matches nothing
//! - a main-content heuristic for arbitrary pages: first of `main`, `article`,
//!   `#content`, ... or the body, with navigation and scripts skipped
//!
//! Block elements become line breaks; runs of spaces collapse and more than
//! one blank line is squeezed to one.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use crate::error::ConfigError;

/// Candidate main-content containers, tried in order.
const MAIN_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role='main']",
    "#content",
    "#main",
    ".content",
    ".main",
];

/// Elements whose text never belongs in the payload.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "form", "button", "iframe",
    "svg", "img", "link", "meta", "template",
];

/// Elements that start a new line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "br", "li", "ul", "ol", "table", "tr", "h1", "h2",
    "h3", "h4", "h5", "h6", "blockquote", "pre", "dd", "dt", "hr",
];

/// Which part of a page becomes the payload.
#[derive(Debug, Clone, Default)]
pub enum ContentTarget {
    /// Main-content heuristic with boilerplate removal
    #[default]
    MainContent,

    /// Text of the first element matching the selector
    Selector(Selector),
}

impl ContentTarget {
    /// Parse a CSS selector target.
    pub fn selector(css: &str) -> Result<Self, ConfigError> {
        Selector::parse(css)
            .map(ContentTarget::Selector)
            .map_err(|e| ConfigError::Invalid {
                key: "selector".into(),
                value: css.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Extract the normalised plain-text payload of `html`.
///
/// Returns an empty string when the page has no text.
pub fn extract_text(html: &str, target: &ContentTarget) -> String {
    let document = Html::parse_document(html);

    let root = match target {
        ContentTarget::Selector(selector) => match document.select(selector).next() {
            Some(el) => el,
            None => {
                debug!("Content selector matched nothing, using whole document");
                document.root_element()
            }
        },
        ContentTarget::MainContent => main_content(&document),
    };

    let mut raw = String::new();
    collect_text(root, &mut raw);
    normalize_whitespace(&raw)
}

fn main_content(document: &Html) -> ElementRef<'_> {
    for selector_str in MAIN_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(main) = document.select(&selector).next() {
                return main;
            }
        }
    }

    if let Ok(body_selector) = Selector::parse("body") {
        if let Some(body) = document.select(&body_selector).next() {
            debug!("No main content container found, using body");
            return body;
        }
    }

    document.root_element()
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIP_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

lazy_static! {
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Collapse horizontal whitespace, trim lines and squeeze blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    let lines: Vec<String> = text
        .replace('\u{a0}', " ")
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect();

    BLANK_RUNS
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_PAGE: &str = r#"
        <html><body>
          <nav>Catalog Home | Programs</nav>
          <div id="acalog-course-preview">
            <h1>ACCT 2013 - Accounting Principles I</h1>
            <p>Credits: 3</p>
            <p>An introduction to&nbsp;financial   accounting.</p>
            <script>var tracking = 1;</script>
          </div>
          <footer>Copyright</footer>
        </body></html>"#;

    #[test]
    fn test_targeted_selector() {
        let target = ContentTarget::selector("div#acalog-course-preview").unwrap();
        let text = extract_text(DETAIL_PAGE, &target);

        assert!(text.starts_with("ACCT 2013 - Accounting Principles I"));
        assert!(text.contains("An introduction to financial accounting."));
        assert!(!text.contains("tracking"));
        assert!(!text.contains("Catalog Home"));
    }

    #[test]
    fn test_selector_miss_uses_whole_document() {
        let target = ContentTarget::selector("#missing").unwrap();
        let text = extract_text(DETAIL_PAGE, &target);
        assert!(text.contains("Accounting Principles I"));
    }

    #[test]
    fn test_main_content_heuristic_skips_boilerplate() {
        let html = r#"<html><body>
            <header>Site header</header>
            <main><h2>Core Courses</h2><ul><li>CS 1103</li><li>CS 2203</li></ul></main>
            <aside>Related links</aside>
        </body></html>"#;

        let text = extract_text(html, &ContentTarget::MainContent);
        assert_eq!(text, "Core Courses\n\nCS 1103\n\nCS 2203");
    }

    #[test]
    fn test_body_fallback_removes_nav() {
        let html = "<html><body><nav>Menu</nav><p>Requirements</p><footer>Bye</footer></body></html>";
        assert_eq!(extract_text(html, &ContentTarget::MainContent), "Requirements");
    }

    #[test]
    fn test_empty_page() {
        let html = "<html><body><script>x()</script></body></html>";
        assert_eq!(extract_text(html, &ContentTarget::MainContent), "");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(ContentTarget::selector("div[").is_err());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \t b \n\n\n\n c  "), "a b\n\nc");
    }
}
