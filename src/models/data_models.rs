use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Wire format of every timestamp written to result files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One scraped product page. Failed fetches carry `error` and never a price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_url: String,
    pub product_name: Option<String>,
    pub price: Option<Price>,
    pub currency: Option<String>,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Normalized decimal price, kept as text so "240.00" survives a round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(String);

/// Products found for one keyword, in discovery order, unique by URL
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResult {
    keyword: String,
    records: Vec<ProductRecord>,
    seen_urls: HashSet<String>,
}

impl ProductRecord {
    pub fn scraped(
        product_url: &str,
        product_name: Option<String>,
        price: Option<Price>,
        currency: Option<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            product_url: product_url.to_string(),
            product_name,
            price,
            currency,
            timestamp,
            error: None,
        }
    }

    pub fn failed(product_url: &str, error: impl fmt::Display, timestamp: NaiveDateTime) -> Self {
        Self {
            product_url: product_url.to_string(),
            product_name: None,
            price: None,
            currency: None,
            timestamp,
            error: Some(error.to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

impl Price {
    /// Accepts plain decimal text such as "240.00"; anything unparsable is rejected
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(|_| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> f64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl SearchResult {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            ..Default::default()
        }
    }

    pub fn from_records(keyword: &str, records: Vec<ProductRecord>) -> Self {
        let mut result = Self::new(keyword);
        for record in records {
            result.push(record);
        }
        result
    }

    /// Adds the record unless its URL is already present
    pub fn push(&mut self, record: ProductRecord) -> bool {
        if !self.seen_urls.insert(record.product_url.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.seen_urls.contains(url)
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_scraped_record_json_shape() {
        let record = ProductRecord::scraped(
            "https://shop.example.com/products/a",
            Some("Eye Tip".to_string()),
            Price::parse("240.00"),
            Some("EUR".to_string()),
            at(),
        );

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"product_url":"https://shop.example.com/products/a","product_name":"Eye Tip","price":"240.00","currency":"EUR","timestamp":"2024-03-01 12:30:05"}"#
        );
    }

    #[test]
    fn test_failed_record_carries_error_and_nulls() {
        let record = ProductRecord::failed("https://shop.example.com/products/b", "HTTP Error: 404", at());
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();

        assert_eq!(json["error"], "HTTP Error: 404");
        assert!(json["price"].is_null());
        assert!(json["product_name"].is_null());
        assert!(json["currency"].is_null());
        assert!(record.is_failed());
    }

    #[test]
    fn test_record_without_optional_keys_parses() {
        let record: ProductRecord = serde_json::from_str(
            r#"{"product_url":"u","price":null,"error":"Timeout Error","timestamp":"2024-03-01 12:30:05"}"#,
        )
        .unwrap();

        assert_eq!(record.product_name, None);
        assert_eq!(record.error.as_deref(), Some("Timeout Error"));
        assert_eq!(record.timestamp, at());
    }

    #[test]
    fn test_price_parse() {
        assert_eq!(Price::parse("150.00").unwrap().as_str(), "150.00");
        assert_eq!(Price::parse(" 99.5 ").unwrap().value(), 99.5);
        assert!(Price::parse("abc").is_none());
        assert!(Price::parse("NaN").is_none());
    }

    #[test]
    fn test_search_result_dedups_by_url() {
        let mut result = SearchResult::new("thermage");
        assert!(result.push(ProductRecord::failed("u1", "x", at())));
        assert!(result.push(ProductRecord::failed("u2", "x", at())));
        assert!(!result.push(ProductRecord::failed("u1", "y", at())));

        assert_eq!(result.len(), 2);
        assert_eq!(result.records()[0].product_url, "u1");
        assert_eq!(result.records()[0].error.as_deref(), Some("x"));
    }
}
