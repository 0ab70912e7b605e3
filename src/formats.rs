//! Display formatting for dates, lots and prices.

use serde_json::{Map, Value};

/// `YYYY-MM-DD`, as accepted by `chrono::NaiveDate::parse_from_str`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const LOTS: &[(&str, &str, &str)] = &[
    ("saas", "SaaS", "Software as a Service"),
    ("iaas", "IaaS", "Infrastructure as a Service"),
    ("paas", "PaaS", "Platform as a Service"),
    ("scs", "SCS", "Specialist Cloud Services"),
];

/// Errors for prices that cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceFormatError {
    MissingMinPrice,
    MissingUnit,
}

impl std::fmt::Display for PriceFormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceFormatError::MissingMinPrice => write!(f, "Price has no minimum value"),
            PriceFormatError::MissingUnit => write!(f, "Price has no unit"),
        }
    }
}

impl std::error::Error for PriceFormatError {}

/// `saas` -> `SaaS`, ...; `None` for an unknown lot.
pub fn lot_to_lot_case(lot: &str) -> Option<&'static str> {
    LOTS.iter()
        .find(|(slug, _, _)| *slug == lot)
        .map(|(_, case, _)| *case)
}

/// `saas` -> `Software as a Service`, ...; `None` for an unknown lot.
pub fn label_for_lot_param(lot: &str) -> Option<&'static str> {
    LOTS.iter()
        .find(|(slug, _, _)| *slug == lot)
        .map(|(_, _, label)| *label)
}

/// Renders `£<min>[ to £<max>] per <unit>[ per <interval>]`.
pub fn format_price(
    min_price: Option<&str>,
    max_price: Option<&str>,
    unit: Option<&str>,
    interval: Option<&str>,
) -> Result<String, PriceFormatError> {
    let min_price = min_price.ok_or(PriceFormatError::MissingMinPrice)?;
    let unit = unit.ok_or(PriceFormatError::MissingUnit)?;

    let mut formatted = format!("£{}", min_price);
    if let Some(max_price) = max_price.filter(|p| !p.is_empty()) {
        formatted.push_str(&format!(" to £{}", max_price));
    }
    formatted.push_str(&format!(" per {}", unit.to_lowercase()));
    if let Some(interval) = interval.filter(|i| !i.is_empty()) {
        formatted.push_str(&format!(" per {}", interval.to_lowercase()));
    }

    Ok(formatted)
}

/// Formats a service document's `priceMin`/`priceMax`/`priceUnit`/`priceInterval`.
/// A service without a minimum price renders as an empty string.
pub fn format_service_price(service: &Map<String, Value>) -> Result<String, PriceFormatError> {
    let field = |key: &str| service.get(key).and_then(Value::as_str);

    match field("priceMin") {
        Some(min_price) if !min_price.is_empty() => format_price(
            Some(min_price),
            field("priceMax"),
            field("priceUnit"),
            field("priceInterval"),
        ),
        _ => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_returns_lot_in_lot_case() {
        let cases = [
            ("saas", Some("SaaS")),
            ("iaas", Some("IaaS")),
            ("paas", Some("PaaS")),
            ("scs", Some("SCS")),
            ("dewdew", None),
        ];

        for (example, expected) in cases {
            assert_eq!(lot_to_lot_case(example), expected);
        }
    }

    #[test]
    fn test_returns_label_for_lot() {
        let cases = [
            ("saas", Some("Software as a Service")),
            ("iaas", Some("Infrastructure as a Service")),
            ("paas", Some("Platform as a Service")),
            ("scs", Some("Specialist Cloud Services")),
            ("dewdew", None),
        ];

        for (example, expected) in cases {
            assert_eq!(label_for_lot_param(example), expected);
        }
    }

    #[test]
    fn test_format_price() {
        let cases = [
            ((Some("12"), None, Some("Unit"), None), "£12 per unit"),
            ((Some("12"), Some("13"), Some("Unit"), None), "£12 to £13 per unit"),
            (
                (Some("12"), Some("13"), Some("Unit"), Some("Second")),
                "£12 to £13 per unit per second",
            ),
            ((Some("12"), None, Some("Unit"), Some("Second")), "£12 per unit per second"),
        ];

        for ((min, max, unit, interval), expected) in cases {
            assert_eq!(format_price(min, max, unit, interval).unwrap(), expected);
        }
    }

    #[test]
    fn test_format_price_errors() {
        assert_eq!(
            format_price(Some("12"), None, None, None),
            Err(PriceFormatError::MissingUnit)
        );
        assert_eq!(
            format_price(None, None, None, None),
            Err(PriceFormatError::MissingMinPrice)
        );
    }

    #[test]
    fn test_format_service_price() {
        let service = |price_min: Value| {
            json!({
                "priceMin": price_min,
                "priceMax": "13.13",
                "priceUnit": "Unit",
                "priceInterval": "Second",
            })
            .as_object()
            .cloned()
            .unwrap()
        };

        assert_eq!(
            format_service_price(&service(json!("12.12"))).unwrap(),
            "£12.12 to £13.13 per unit per second"
        );
        assert_eq!(format_service_price(&service(json!(""))).unwrap(), "");
        assert_eq!(format_service_price(&service(Value::Null)).unwrap(), "");
        assert_eq!(format_service_price(&Map::new()).unwrap(), "");
    }

    #[test]
    fn test_date_format_parses_iso_dates() {
        assert!(chrono::NaiveDate::parse_from_str("2015-01-31", DATE_FORMAT).is_ok());
        assert!(chrono::NaiveDate::parse_from_str("31/01/2015", DATE_FORMAT).is_err());
    }
}
