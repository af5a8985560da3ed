//! Link discovery rules for index pages.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::ConfigError;

fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::Invalid {
        key: "selector".into(),
        value: css.to_string(),
        reason: e.to_string(),
    })
}

fn parse_regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::Invalid {
        key: "pattern".into(),
        value: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Turns matching elements of a page into absolute URLs.
///
/// Each element matched by `selector` contributes the value of `attribute`
/// if it matches `pattern`. With a template, the URL is built from the
/// pattern's capture groups (`$1`, `$2`, ...); without one, the attribute
/// value itself is the (possibly relative) URL.
#[derive(Debug, Clone)]
pub struct LinkRule {
    selector: Selector,
    attribute: String,
    pattern: Regex,
    template: Option<String>,
}

impl LinkRule {
    pub fn new(css: &str, attribute: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: parse_selector(css)?,
            attribute: attribute.into(),
            pattern: parse_regex(pattern)?,
            template: None,
        })
    }

    /// Build URLs from capture groups instead of using the attribute value.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Acalog course links: `onclick="showCourse('7', '12345', ...)"` →
    /// `preview_course.php?catoid=7&coid=12345`.
    pub fn acalog_course() -> Result<Self, ConfigError> {
        Ok(Self::new(
            "a[onclick]",
            "onclick",
            r"showCourse\('(\d+)',\s*'(\d+)'",
        )?
        .with_template("preview_course.php?catoid=$1&coid=$2"))
    }

    /// Links in the whole document, in document order, duplicates kept.
    pub fn extract(&self, html: &str, base: &Url) -> Vec<String> {
        let document = Html::parse_document(html);
        self.extract_in(document.root_element(), base)
    }

    /// Links below `root`, in document order, duplicates kept.
    pub fn extract_in(&self, root: ElementRef<'_>, base: &Url) -> Vec<String> {
        root.select(&self.selector)
            .filter_map(|el| el.value().attr(&self.attribute))
            .filter_map(|value| self.candidate(value))
            .filter_map(|candidate| base.join(&candidate).ok())
            .map(|url| url.to_string())
            .collect()
    }

    fn candidate(&self, value: &str) -> Option<String> {
        let caps = self.pattern.captures(value)?;
        match &self.template {
            Some(template) => {
                let mut out = String::new();
                caps.expand(template, &mut out);
                Some(out)
            }
            None => Some(value.trim().to_string()),
        }
    }
}

/// Where pagination links live on an index page.
///
/// Containers are tried in order; the first that exists (and, when a marker
/// is given, whose text contains it) is searched with the link rule.
#[derive(Debug, Clone)]
pub struct PagerRule {
    containers: Vec<(Selector, Option<String>)>,
    links: LinkRule,
}

impl PagerRule {
    pub fn new(links: LinkRule) -> Self {
        Self {
            containers: Vec::new(),
            links,
        }
    }

    /// Add a candidate container, optionally requiring `marker` in its text.
    pub fn container(mut self, css: &str, marker: Option<&str>) -> Result<Self, ConfigError> {
        self.containers
            .push((parse_selector(css)?, marker.map(str::to_string)));
        Ok(self)
    }

    /// Acalog pager: `td.acalog-course-filter-pager`, or a `table.table_default`
    /// whose text contains "Page:".
    pub fn acalog() -> Result<Self, ConfigError> {
        Self::new(LinkRule::new("a[href]", "href", r"cpage=\d+")?)
            .container("td.acalog-course-filter-pager", None)?
            .container("table.table_default", Some("Page:"))
    }

    /// Pagination URLs on the page, deduplicated, in document order.
    pub fn extract(&self, html: &str, base: &Url) -> Vec<String> {
        let document = Html::parse_document(html);

        let container = self.containers.iter().find_map(|(selector, marker)| {
            document.select(selector).find(|el| match marker {
                Some(marker) => el.text().collect::<String>().contains(marker.as_str()),
                None => true,
            })
        });

        let Some(container) = container else {
            return Vec::new();
        };

        let mut urls: Vec<String> = Vec::new();
        for url in self.links.extract_in(container, base) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }
}
