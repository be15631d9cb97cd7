use std::collections::BTreeMap;
use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;

/// Which heuristic produced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    StructuredMeta,
    PlatformMeta,
    LinkedData,
    VisibleElement,
    InlineScript,
    FrequencyFallback,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::StructuredMeta => "structured_meta",
            CandidateSource::PlatformMeta => "platform_meta",
            CandidateSource::LinkedData => "linked_data",
            CandidateSource::VisibleElement => "visible_element",
            CandidateSource::InlineScript => "inline_script",
            CandidateSource::FrequencyFallback => "frequency_fallback",
        }
    }
}

/// A price produced by one heuristic. Transient: created and discarded
/// within a single extraction call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceCandidate {
    pub value: Decimal,
    pub source: CandidateSource,
    pub confidence: u8,
}

/// Heuristic, multi-strategy price extractor for uncontrolled e-commerce
/// HTML. Pure and deterministic: no I/O, identical input always yields an
/// identical result, malformed input yields `None` rather than a panic.
pub struct PriceExtractor {
    config: ExtractorConfig,
    fragment_token: Regex,
    currency_token: Regex,
    script_assignments: Vec<Regex>,
}

impl Default for PriceExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl PriceExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self {
            config,
            // Currency-symbol-prefixed amount, or a bare amount with exactly
            // two fractional digits. Comma-grouped forms are tried before
            // plain digit runs so "$1,299.99" and "$1299.99" both parse whole.
            fragment_token: Regex::new(
                r"[$£€¥₹]\s*(?:\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+\.\d{2}|\d+)|\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2}",
            )
            .unwrap(),
            // Strictly currency-prefixed, used by the whole-document scan
            currency_token: Regex::new(
                r"[$£€¥₹]\s*(?:\d{1,3}(?:,\d{3})+(?:\.\d{2})?|\d+\.\d{2}|\d+)",
            )
            .unwrap(),
            script_assignments: vec![
                Regex::new(
                    r#"(?:ShopifyAnalytics\.meta|analytics\.meta|meta)\.price\s*=\s*['"]?(\d+(?:\.\d{1,2})?)"#,
                )
                .unwrap(),
                Regex::new(
                    r#"dataLayer\.push\(\s*\{[^}]*['"]price['"]\s*:\s*['"]?(\d+(?:\.\d{1,2})?)"#,
                )
                .unwrap(),
                Regex::new(r#"['"]productPrice['"]\s*:\s*['"]?(\d+(?:\.\d{1,2})?)"#).unwrap(),
            ],
        }
    }

    /// Infers the single best price from a supplier product page, or `None`
    /// when no heuristic finds one.
    ///
    /// All heuristics run and may each contribute candidates; the winner is
    /// the highest confidence, with ties broken toward the largest value
    /// (tied high-confidence candidates are usually a sale/regular price
    /// pair, and the non-discounted price is the safer baseline).
    pub fn extract(&self, html: &str, source_url: &str) -> Option<PriceCandidate> {
        self.candidates(html, source_url)
            .into_iter()
            .max_by(|a, b| {
                a.confidence
                    .cmp(&b.confidence)
                    .then_with(|| a.value.cmp(&b.value))
            })
    }

    /// Every candidate the document produces, in heuristic priority order.
    pub fn candidates(&self, html: &str, source_url: &str) -> Vec<PriceCandidate> {
        let document = Html::parse_document(html);
        let minor_units = self.is_minor_unit_platform(html, source_url);

        let mut candidates = Vec::new();
        candidates.extend(self.structured_meta(&document));
        candidates.extend(self.platform_meta(&document, minor_units));
        candidates.extend(self.linked_data(&document));
        candidates.extend(self.visible_element(&document));
        candidates.extend(self.inline_script(&document, minor_units));
        candidates.extend(self.frequency_fallback(html));
        candidates
    }

    /// Structured commerce price annotations in the document head.
    fn structured_meta(&self, document: &Html) -> Vec<PriceCandidate> {
        let mut found = Vec::new();
        for selector in [
            "meta[property=\"og:price:amount\"]",
            "meta[property=\"product:price:amount\"]",
            "meta[itemprop=\"price\"]",
        ] {
            let selector = Selector::parse(selector).unwrap();
            for element in document.select(&selector) {
                if let Some(value) = element.value().attr("content").and_then(parse_money) {
                    found.push(PriceCandidate {
                        value,
                        source: CandidateSource::StructuredMeta,
                        confidence: self.config.structured_meta_confidence,
                    });
                }
            }
        }
        found
    }

    /// Platform-embedded JSON product metadata, the Shopify `var meta = {...}`
    /// blob. Variant prices on minor-unit platforms arrive in cents.
    fn platform_meta(&self, document: &Html, minor_units: bool) -> Vec<PriceCandidate> {
        let selector = Selector::parse("script").unwrap();
        let mut found = Vec::new();

        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            let Some(start) = text
                .find("var meta =")
                .or_else(|| text.find("window.meta ="))
            else {
                continue;
            };
            let Some(json) = balanced_json(&text[start..]) else {
                continue;
            };
            let Ok(meta) = serde_json::from_str::<serde_json::Value>(json) else {
                continue;
            };

            let mut raw = Vec::new();
            if let Some(variants) = meta
                .get("product")
                .and_then(|p| p.get("variants"))
                .and_then(|v| v.as_array())
            {
                for variant in variants {
                    if let Some(price) = variant.get("price").and_then(decimal_from_json) {
                        raw.push(price);
                    }
                }
            } else if let Some(price) = meta.get("price").and_then(decimal_from_json) {
                raw.push(price);
            }

            for value in raw {
                if let Some(value) = self.validate(self.normalize_minor_units(value, minor_units)) {
                    found.push(PriceCandidate {
                        value,
                        source: CandidateSource::PlatformMeta,
                        confidence: self.config.platform_meta_confidence,
                    });
                }
            }
        }
        found
    }

    /// JSON-LD Product/Offer markup, including `@graph` containers and
    /// offer arrays.
    fn linked_data(&self, document: &Html) -> Vec<PriceCandidate> {
        let selector = Selector::parse("script[type=\"application/ld+json\"]").unwrap();
        let mut found = Vec::new();

        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            let Ok(data) = serde_json::from_str::<serde_json::Value>(&text) else {
                continue;
            };
            let mut prices = Vec::new();
            collect_offer_prices(&data, &mut prices);
            for value in prices {
                if let Some(value) = self.validate(value) {
                    found.push(PriceCandidate {
                        value,
                        source: CandidateSource::LinkedData,
                        confidence: self.config.linked_data_confidence,
                    });
                }
            }
        }
        found
    }

    /// Visible price text behind the configured anchor selectors. The list
    /// is priority-ordered: the first anchor with a parseable fragment wins,
    /// and within the fragment the first currency-formatted token is taken.
    fn visible_element(&self, document: &Html) -> Option<PriceCandidate> {
        for anchor in &self.config.anchor_selectors {
            let Ok(selector) = Selector::parse(anchor) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = element.text().collect::<Vec<_>>().join(" ");
                let token = self.fragment_token.find(&text);
                if let Some(value) = token.and_then(|m| parse_money(m.as_str())) {
                    return Some(PriceCandidate {
                        value,
                        source: CandidateSource::VisibleElement,
                        confidence: self.config.visible_element_confidence,
                    });
                }
            }
        }
        None
    }

    /// Inline script variable assignments matching known platform patterns,
    /// e.g. `ShopifyAnalytics.meta.price = 12995`.
    fn inline_script(&self, document: &Html, minor_units: bool) -> Vec<PriceCandidate> {
        let selector = Selector::parse("script").unwrap();
        let mut found = Vec::new();

        for element in document.select(&selector) {
            let text = element.text().collect::<String>();
            for pattern in &self.script_assignments {
                for captures in pattern.captures_iter(&text) {
                    let Some(raw) = captures.get(1) else {
                        continue;
                    };
                    let Ok(value) = Decimal::from_str(raw.as_str()) else {
                        continue;
                    };
                    if let Some(value) =
                        self.validate(self.normalize_minor_units(value, minor_units))
                    {
                        found.push(PriceCandidate {
                            value,
                            source: CandidateSource::InlineScript,
                            confidence: self.config.inline_script_confidence,
                        });
                    }
                }
            }
        }
        found
    }

    /// Last resort: bucket every currency-formatted substring in the raw
    /// document by value and take the most frequent. Frequency ties go to
    /// the larger value so the result stays deterministic.
    fn frequency_fallback(&self, html: &str) -> Option<PriceCandidate> {
        let mut buckets: BTreeMap<Decimal, usize> = BTreeMap::new();
        for token in self.currency_token.find_iter(html) {
            if let Some(value) = parse_money(token.as_str()) {
                *buckets.entry(value).or_insert(0) += 1;
            }
        }

        let mut best: Option<(Decimal, usize)> = None;
        for (value, count) in buckets {
            let better = match best {
                None => true,
                Some((best_value, best_count)) => {
                    count > best_count || (count == best_count && value > best_value)
                }
            };
            if better {
                best = Some((value, count));
            }
        }

        best.map(|(value, _)| PriceCandidate {
            value,
            source: CandidateSource::FrequencyFallback,
            confidence: self.config.frequency_fallback_confidence,
        })
    }

    /// Platforms that embed prices in minor units (cents). Currently the
    /// Shopify family, recognized by host or by asset/runtime markers.
    fn is_minor_unit_platform(&self, html: &str, source_url: &str) -> bool {
        let host_hit = url::Url::parse(source_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.contains("shopify")))
            .unwrap_or(false);

        host_hit
            || html.contains("cdn.shopify.com")
            || html.contains("ShopifyAnalytics")
            || html.contains("Shopify.theme")
    }

    /// Minor-unit conversion applies to whole candidates only: an integral
    /// value above the threshold on a minor-unit platform divides by 100,
    /// anything else passes through untouched.
    fn normalize_minor_units(&self, value: Decimal, minor_units: bool) -> Decimal {
        if minor_units
            && value.fract().is_zero()
            && value > Decimal::from(self.config.minor_unit_threshold)
        {
            value / Decimal::from(100)
        } else {
            value
        }
    }

    fn validate(&self, value: Decimal) -> Option<Decimal> {
        if value > Decimal::ZERO {
            Some(value)
        } else {
            None
        }
    }
}

/// Strips currency symbols and thousands separators and parses the rest.
/// Zero and negative amounts are rejected.
fn parse_money(token: &str) -> Option<Decimal> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value = Decimal::from_str(&cleaned).ok()?;
    if value > Decimal::ZERO {
        Some(value)
    } else {
        None
    }
}

/// JSON prices appear as numbers or as "129.95" strings; both parse via the
/// serde_json string form so the decimal representation stays exact.
fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => parse_money(s),
        _ => None,
    }
}

/// Walks a JSON-LD document collecting offer prices. Recurses through
/// arrays, `@graph` containers, and Product `offers`; reads `price` (or
/// `lowPrice` for aggregate offers) from anything typed as an offer.
fn collect_offer_prices(value: &serde_json::Value, out: &mut Vec<Decimal>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_offer_prices(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            let type_matches = |needle: &str| {
                map.get("@type").is_some_and(|t| match t {
                    serde_json::Value::String(s) => s.contains(needle),
                    serde_json::Value::Array(a) => a
                        .iter()
                        .any(|v| v.as_str().is_some_and(|s| s.contains(needle))),
                    _ => false,
                })
            };

            if type_matches("Offer") {
                if let Some(price) = map
                    .get("price")
                    .or_else(|| map.get("lowPrice"))
                    .and_then(decimal_from_json)
                {
                    out.push(price);
                }
            }

            if let Some(graph) = map.get("@graph") {
                collect_offer_prices(graph, out);
            }
            if let Some(offers) = map.get("offers") {
                collect_offer_prices(offers, out);
            }
        }
        _ => {}
    }
}

/// Extracts the first balanced `{...}` object from a script fragment,
/// tracking string and escape state so braces inside values don't break
/// the match.
fn balanced_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
