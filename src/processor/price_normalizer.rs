use anyhow::Result;
use regex::Regex;

use crate::models::Price;

/// Numeric price and currency code recovered from raw price text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedPrice {
    pub price: Option<Price>,
    pub currency: Option<String>,
}

/// Turns scraped price text such as "EUR 240,00" into a decimal and a currency code.
///
/// A comma is always read as the decimal separator, so "1,234.56" becomes "1.234".
/// Thousands separators are not recognised.
pub struct PriceNormalizer {
    number_regex: Regex,
    currency_regex: Regex,
}

impl PriceNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            number_regex: Regex::new(r"[0-9]+(?:[,.][0-9]+)?")?,
            currency_regex: Regex::new(r"[A-Z]{3}")?,
        })
    }

    pub fn normalize(&self, text: &str) -> NormalizedPrice {
        let Some(number) = self.number_regex.find(text) else {
            return NormalizedPrice::default();
        };

        let price = Price::parse(&number.as_str().replacen(',', ".", 1));
        let currency = self
            .currency_regex
            .find(text)
            .map(|code| code.as_str().to_string());

        NormalizedPrice { price, currency }
    }
}
