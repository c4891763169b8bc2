use scraper::{ElementRef, Html, Selector};

use super::error::QueryError;

/// Queries against a rendered page's DOM
pub trait DomQuery {
    /// Whitespace-normalized text of the first element matching `selector`
    fn first_text(&self, selector: &str) -> Result<Option<String>, QueryError>;

    /// Text of the first element (document order) whose own text contains `needle`
    fn first_text_containing(&self, needle: &str) -> Result<Option<String>, QueryError>;

    /// Values of `attribute` on every element matching `selector`
    fn attribute_values(&self, selector: &str, attribute: &str) -> Result<Vec<String>, QueryError>;
}

/// Selector queries run over raw markup rather than the rendered DOM
pub trait MarkupQuery: Send + Sync {
    /// Own (direct child) text of the first matching element that has any
    fn first_text(&self, markup: &str, selector: &str) -> Result<Option<String>, QueryError>;
}

/// Output of the render capability: status, final markup and a DOM to query
pub struct RenderedPage {
    url: String,
    status: u16,
    markup: String,
    dom: Box<dyn DomQuery>,
}

impl RenderedPage {
    pub fn new(url: &str, status: u16, markup: String, dom: Box<dyn DomQuery>) -> Self {
        Self {
            url: url.to_string(),
            status,
            markup,
            dom,
        }
    }

    /// Page whose DOM is the parsed markup itself
    pub fn from_html(url: &str, status: u16, markup: String) -> Self {
        let dom = HtmlDom::parse(&markup);
        Self::new(url, status, markup, Box::new(dom))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Anything below 400 carries a page worth extracting
    pub fn is_renderable(&self) -> bool {
        is_renderable_status(self.status)
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn dom(&self) -> &dyn DomQuery {
        self.dom.as_ref()
    }
}

pub fn is_renderable_status(status: u16) -> bool {
    status < 400
}

/// DOM snapshot backed by the `scraper` HTML parser
pub struct HtmlDom {
    document: Html,
}

impl HtmlDom {
    pub fn parse(markup: &str) -> Self {
        Self {
            document: Html::parse_document(markup),
        }
    }
}

impl DomQuery for HtmlDom {
    fn first_text(&self, selector: &str) -> Result<Option<String>, QueryError> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .map(normalized_text)
            .filter(|text| !text.is_empty()))
    }

    fn first_text_containing(&self, needle: &str) -> Result<Option<String>, QueryError> {
        let any = parse_selector("body *")?;
        Ok(self
            .document
            .select(&any)
            .filter(|element| !matches!(element.value().name(), "script" | "style" | "noscript"))
            .find(|element| {
                element
                    .children()
                    .filter_map(|child| child.value().as_text())
                    .any(|text| text.contains(needle))
            })
            .map(normalized_text))
    }

    fn attribute_values(&self, selector: &str, attribute: &str) -> Result<Vec<String>, QueryError> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .filter_map(|element| element.value().attr(attribute))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect())
    }
}

/// Re-parses the raw markup for every query
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlMarkupQuery;

impl MarkupQuery for HtmlMarkupQuery {
    fn first_text(&self, markup: &str, selector: &str) -> Result<Option<String>, QueryError> {
        let selector = parse_selector(selector)?;
        let document = Html::parse_document(markup);
        let text = document
            .select(&selector)
            .map(own_text)
            .find(|text| !text.is_empty());
        Ok(text)
    }
}

fn parse_selector(selector: &str) -> Result<Selector, QueryError> {
    Selector::parse(selector).map_err(|e| QueryError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

fn normalized_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn own_text(element: ElementRef) -> String {
    element
        .children()
        .filter_map(|child| child.value().as_text())
        .flat_map(|text| text.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}
