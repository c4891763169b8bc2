use std::cmp::Ordering;

use crate::models::{ProductRecord, SearchResult};

const NAME_LIMIT: usize = 37;
const DISPLAY_CURRENCY: &str = "EUR";

/// Console report for one keyword: price table sorted cheapest first, then details
pub fn render_results(result: &SearchResult) -> String {
    let rule = "=".repeat(80);
    let mut out = format!("\n{rule}\nSEARCH RESULTS FOR: '{}'\n{rule}\n", result.keyword());

    if result.is_empty() {
        out.push_str("No matching products found.\n");
        return out;
    }

    let divider = "-".repeat(60);
    out.push_str(&format!("\nPRICE SUMMARY:\n{divider}\n"));
    out.push_str(&format!("{:<40} | {:<15}\n{divider}\n", "PRODUCT", "PRICE"));

    let mut sorted: Vec<&ProductRecord> = result.records().iter().collect();
    sorted.sort_by(|a, b| {
        sort_price(a)
            .partial_cmp(&sort_price(b))
            .unwrap_or(Ordering::Equal)
    });
    for record in sorted {
        out.push_str(&format!(
            "{:<40} | {:<15}\n",
            truncate_name(display_name(record)),
            price_label(record)
        ));
    }
    out.push_str(&format!("{divider}\n"));

    out.push_str("\nDETAILED PRODUCT INFORMATION:\n");
    for (index, record) in result.records().iter().enumerate() {
        out.push_str(&format!(
            "\n[{}] Product: {}\n    URL: {}\n    Price: {}\n",
            index + 1,
            display_name(record),
            record.product_url,
            price_label(record)
        ));
    }
    out.push_str(&format!("\n{rule}\n"));
    out
}

fn sort_price(record: &ProductRecord) -> f64 {
    record.price.as_ref().map(|p| p.value()).unwrap_or(0.0)
}

fn display_name(record: &ProductRecord) -> &str {
    record.product_name.as_deref().unwrap_or("Unknown")
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > NAME_LIMIT {
        let head: String = name.chars().take(NAME_LIMIT - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn price_label(record: &ProductRecord) -> String {
    match &record.price {
        Some(price) => format!(
            "{} {}",
            record.currency.as_deref().unwrap_or(DISPLAY_CURRENCY),
            price
        ),
        None => "Not available".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Price;
    use chrono::NaiveDate;

    fn record(url: &str, name: &str, price: Option<&str>, currency: Option<&str>) -> ProductRecord {
        ProductRecord::scraped(
            url,
            Some(name.to_string()),
            price.and_then(Price::parse),
            currency.map(str::to_string),
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_table_sorted_by_price_with_fallbacks() {
        let result = SearchResult::from_records(
            "thermage",
            vec![
                record("u1", "Body Tip", Some("300.00"), Some("EUR")),
                record("u2", "Eye Tip", Some("150.00"), None),
                record("u3", "Consultation", None, None),
            ],
        );

        let text = render_results(&result);
        let consult = text.find("Consultation ").unwrap();
        let eye = text.find("Eye Tip ").unwrap();
        let body = text.find("Body Tip ").unwrap();
        assert!(consult < eye && eye < body);
        assert!(text.contains("| EUR 150.00"));
        assert!(text.contains("| Not available"));
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "Thermage FLX Total Tip 4.0cm2 900 REP Replacement";
        assert_eq!(truncate_name(long).chars().count(), NAME_LIMIT);
        assert!(truncate_name(long).ends_with("..."));
        assert_eq!(truncate_name("Eye Tip"), "Eye Tip");
    }

    #[test]
    fn test_details_keep_scrape_order_and_close_the_report() {
        let result = SearchResult::from_records(
            "thermage",
            vec![
                record("https://s.test/products/b", "Body Tip", Some("300.00"), Some("EUR")),
                record("https://s.test/products/e", "Eye Tip", Some("150.00"), None),
            ],
        );

        let text = render_results(&result);
        assert!(text.contains(
            "\n[1] Product: Body Tip\n    URL: https://s.test/products/b\n    Price: EUR 300.00\n"
        ));
        assert!(text.contains("\n[2] Product: Eye Tip\n"));
        assert!(text.ends_with(&format!("\n{}\n", "=".repeat(80))));
    }

    #[test]
    fn test_empty_result() {
        let text = render_results(&SearchResult::new("nothing"));
        assert!(text.contains("SEARCH RESULTS FOR: 'nothing'"));
        assert!(text.contains("No matching products found."));
    }
}
