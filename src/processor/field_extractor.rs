use std::fmt;
use tracing::{debug, warn};

use crate::config::SelectorConfig;
use crate::fetcher::{DomQuery, HtmlMarkupQuery, MarkupQuery, QueryError, RenderedPage};

/// Where on the page the price text came from, in the order strategies are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceStrategy {
    ProductPageClass,
    PriceProductClasses,
    CurrencyMarker,
    /// Index into the configured raw-markup selector list
    MarkupSelector(usize),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub price_text: Option<String>,
    pub price_strategy: Option<PriceStrategy>,
}

/// Locates product name and price text on a rendered page.
///
/// Price strategies run in a fixed order and the first non-empty text wins. A strategy
/// that errors is logged and skipped; nothing here propagates a query failure.
pub struct FieldExtractor {
    selectors: SelectorConfig,
    markup_query: Box<dyn MarkupQuery>,
}

impl FieldExtractor {
    pub fn new(selectors: SelectorConfig) -> Self {
        Self::with_markup_query(selectors, Box::new(HtmlMarkupQuery))
    }

    pub fn with_markup_query(selectors: SelectorConfig, markup_query: Box<dyn MarkupQuery>) -> Self {
        Self {
            selectors,
            markup_query,
        }
    }

    pub fn extract(&self, page: &RenderedPage) -> ExtractedFields {
        let name = self.extract_name(page.dom());
        let (price_text, price_strategy) = match self.extract_price(page) {
            Some((text, strategy)) => (Some(text), Some(strategy)),
            None => (None, None),
        };

        ExtractedFields {
            name,
            price_text,
            price_strategy,
        }
    }

    fn extract_name(&self, dom: &dyn DomQuery) -> Option<String> {
        match dom.first_text(&self.selectors.name_selector) {
            Ok(name) => name,
            Err(e) => {
                warn!("Product name lookup failed: {}", e);
                None
            }
        }
    }

    fn extract_price(&self, page: &RenderedPage) -> Option<(String, PriceStrategy)> {
        for strategy in self.price_strategies() {
            match self.run_strategy(strategy, page) {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!("Price found via {}: {}", strategy, text.trim());
                    return Some((text.trim().to_string(), strategy));
                }
                Ok(_) => debug!("Price strategy {} found nothing", strategy),
                Err(e) => warn!("Price strategy {} failed: {}", strategy, e),
            }
        }

        debug!("No price found on {}", page.url());
        None
    }

    fn price_strategies(&self) -> impl Iterator<Item = PriceStrategy> {
        [
            PriceStrategy::ProductPageClass,
            PriceStrategy::PriceProductClasses,
            PriceStrategy::CurrencyMarker,
        ]
        .into_iter()
        .chain((0..self.selectors.markup_price_selectors.len()).map(PriceStrategy::MarkupSelector))
    }

    fn run_strategy(
        &self,
        strategy: PriceStrategy,
        page: &RenderedPage,
    ) -> Result<Option<String>, QueryError> {
        match strategy {
            PriceStrategy::ProductPageClass => page.dom().first_text(&self.selectors.product_page_price),
            PriceStrategy::PriceProductClasses => {
                page.dom().first_text(&self.selectors.price_product_predicate)
            }
            PriceStrategy::CurrencyMarker => {
                page.dom().first_text_containing(&self.selectors.currency_marker)
            }
            PriceStrategy::MarkupSelector(index) => {
                match self.selectors.markup_price_selectors.get(index) {
                    Some(selector) => self.markup_query.first_text(page.markup(), selector),
                    None => Ok(None),
                }
            }
        }
    }
}

impl fmt::Display for PriceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceStrategy::ProductPageClass => f.write_str("product-page price class"),
            PriceStrategy::PriceProductClasses => f.write_str("price/product class tokens"),
            PriceStrategy::CurrencyMarker => f.write_str("currency marker text"),
            PriceStrategy::MarkupSelector(index) => write!(f, "markup selector #{}", index + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Answers only the name and product-page price queries; anything else panics
    struct SpyDom;

    impl DomQuery for SpyDom {
        fn first_text(&self, selector: &str) -> Result<Option<String>, QueryError> {
            match selector {
                "h1" => Ok(Some("Thermage Eye Tip".to_string())),
                ".price.price--product-page" => Ok(Some("EUR 240,00".to_string())),
                other => panic!("unexpected selector query: {}", other),
            }
        }

        fn first_text_containing(&self, needle: &str) -> Result<Option<String>, QueryError> {
            panic!("unexpected text query: {}", needle)
        }

        fn attribute_values(&self, selector: &str, _: &str) -> Result<Vec<String>, QueryError> {
            panic!("unexpected attribute query: {}", selector)
        }
    }

    struct PanickingMarkupQuery;

    impl MarkupQuery for PanickingMarkupQuery {
        fn first_text(&self, _: &str, selector: &str) -> Result<Option<String>, QueryError> {
            panic!("unexpected markup query: {}", selector)
        }
    }

    fn html_page(markup: &str) -> RenderedPage {
        RenderedPage::from_html("https://shop.example.com/products/x", 200, markup.to_string())
    }

    #[test]
    fn test_first_strategy_short_circuits() {
        let extractor =
            FieldExtractor::with_markup_query(SelectorConfig::default(), Box::new(PanickingMarkupQuery));
        let page = RenderedPage::new(
            "https://shop.example.com/products/x",
            200,
            String::new(),
            Box::new(SpyDom),
        );

        let fields = extractor.extract(&page);
        assert_eq!(fields.name.as_deref(), Some("Thermage Eye Tip"));
        assert_eq!(fields.price_text.as_deref(), Some("EUR 240,00"));
        assert_eq!(fields.price_strategy, Some(PriceStrategy::ProductPageClass));
    }

    #[test]
    fn test_falls_back_to_currency_marker() {
        let extractor = FieldExtractor::new(SelectorConfig::default());
        let page = html_page(
            r#"<html><body><h1>Body Tip</h1><span class="amount">EUR 99,00</span></body></html>"#,
        );

        let fields = extractor.extract(&page);
        assert_eq!(fields.name.as_deref(), Some("Body Tip"));
        assert_eq!(fields.price_text.as_deref(), Some("EUR 99,00"));
        assert_eq!(fields.price_strategy, Some(PriceStrategy::CurrencyMarker));
    }

    #[test]
    fn test_falls_back_to_markup_selectors() {
        let extractor = FieldExtractor::new(SelectorConfig::default());
        let page = html_page(r#"<html><body><div class="price"> 150,00 </div></body></html>"#);

        let fields = extractor.extract(&page);
        assert_eq!(fields.name, None);
        assert_eq!(fields.price_text.as_deref(), Some("150,00"));
        assert_eq!(fields.price_strategy, Some(PriceStrategy::MarkupSelector(3)));
    }

    #[test]
    fn test_failing_strategy_moves_on() {
        let mut selectors = SelectorConfig::default();
        selectors.product_page_price = "[[[".to_string();
        selectors.name_selector = "]]]".to_string();
        let extractor = FieldExtractor::new(selectors);
        let page = html_page(
            r#"<html><body><h1>Tip</h1><div class="product-price">EUR 10,00</div></body></html>"#,
        );

        let fields = extractor.extract(&page);
        assert_eq!(fields.name, None);
        assert_eq!(fields.price_text.as_deref(), Some("EUR 10,00"));
        assert_eq!(fields.price_strategy, Some(PriceStrategy::PriceProductClasses));
    }

    #[test]
    fn test_exhausted_strategies_yield_no_price() {
        let extractor = FieldExtractor::new(SelectorConfig::default());
        let page = html_page("<html><body><h1>Consultation</h1><p>Call us</p></body></html>");

        let fields = extractor.extract(&page);
        assert_eq!(fields.name.as_deref(), Some("Consultation"));
        assert_eq!(fields.price_text, None);
        assert_eq!(fields.price_strategy, None);
    }
}
