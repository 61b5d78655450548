use super::{element_text, selector, ContactItem, ContactKind, ExtractionError, ExtractionMethod};
use regex::Regex;
use scraper::Html;
use std::collections::HashMap;

const MAX_TEXT_EMAILS: usize = 10;
const MAX_TEXT_PHONES: usize = 10;
const MAX_ELEMENT_EMAILS: usize = 3;
const MIN_EMAIL_CHARS: usize = 5;
const MIN_PHONE_DIGITS: usize = 10;
const MIN_TEL_CHARS: usize = 10;

/// Elements whose text is likely to hold contact details
const CONTACT_ELEMENT_SELECTORS: &[&str] = &[
    ".contact",
    ".contact-info",
    ".email",
    ".phone",
    "[class*=\"contact\"]",
    "[id*=\"contact\"]",
];

/// Compiled email and phone patterns
#[derive(Debug)]
pub struct ContactPatterns {
    email: Regex,
    phones: Vec<Regex>,
}

impl ContactPatterns {
    pub fn new() -> Result<Self, ExtractionError> {
        let email = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")?;
        let phones = [
            // US/Canada with optional +1; groups are area code, prefix, line
            r"\b(?:\+?1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})\b",
            // international, + prefixed
            r"\+[1-9]\d{1,3}[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}",
            // plain 10-digit
            r"\b\d{3}[-.\s]?\d{3}[-.\s]?\d{4}\b",
            // parenthesized area code
            r"\(\d{3}\)\s?\d{3}[-.\s]?\d{4}",
        ]
        .iter()
        .map(|p| Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { email, phones })
    }

    /// Distinct lowercased emails in order of first appearance
    fn emails(&self, text: &str, limit: usize) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for m in self.email.find_iter(text) {
            let email = m.as_str().to_lowercase();
            if !found.contains(&email) {
                found.push(email);
            }
        }
        found
            .into_iter()
            .take(limit)
            .filter(|e| e.chars().count() > MIN_EMAIL_CHARS)
            .collect()
    }

    /// Digit-only phone numbers, deduplicated, from the first `limit` raw matches
    fn phones(&self, text: &str, limit: usize) -> Vec<String> {
        let raw = self.phones.iter().flat_map(|re| {
            re.captures_iter(text).map(|caps| {
                if caps.len() > 1 {
                    caps.iter()
                        .skip(1)
                        .flatten()
                        .map(|g| g.as_str())
                        .collect::<String>()
                } else {
                    caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_string()
                }
            })
        });

        let mut phones: Vec<String> = Vec::new();
        for candidate in raw.take(limit) {
            let digits = digits_only(&candidate);
            if digits.len() >= MIN_PHONE_DIGITS && !phones.contains(&digits) {
                phones.push(digits);
            }
        }
        phones
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Extracts emails and phone numbers from the page
///
/// Sources, in output order:
/// 1. regex emails over the page text (0.95)
/// 2. regex phones over the page text (0.8)
/// 3. `mailto:` links (0.98) and `tel:` links (0.98)
/// 4. emails inside contact-ish elements (0.90)
///
/// Duplicate `(kind, value)` pairs collapse onto the first occurrence, which
/// takes the highest confidence seen for that pair.
pub(crate) fn extract_contacts(
    document: &Html,
    page_text: &str,
    page_url: &str,
    patterns: &ContactPatterns,
) -> Result<Vec<ContactItem>, ExtractionError> {
    let item = |kind, value: String, confidence, method| ContactItem {
        kind,
        value,
        page_url: page_url.to_string(),
        confidence,
        method,
    };
    let mut contacts = Vec::new();

    for email in patterns.emails(page_text, MAX_TEXT_EMAILS) {
        contacts.push(item(
            ContactKind::Email,
            email,
            0.95,
            ExtractionMethod::RegexPatternMatching,
        ));
    }

    for phone in patterns.phones(page_text, MAX_TEXT_PHONES) {
        contacts.push(item(
            ContactKind::Phone,
            phone,
            0.8,
            ExtractionMethod::RegexPatternMatching,
        ));
    }

    let mailto = selector("a[href^=\"mailto:\"]")?;
    for link in document.select(&mailto) {
        let href = link.value().attr("href").unwrap_or_default();
        let address = href
            .trim_start_matches("mailto:")
            .split('?')
            .next()
            .unwrap_or_default()
            .trim();
        if address.contains('@') {
            contacts.push(item(
                ContactKind::Email,
                address.to_lowercase(),
                0.98,
                ExtractionMethod::HtmlMailtoLink,
            ));
        }
    }

    let tel = selector("a[href^=\"tel:\"]")?;
    for link in document.select(&tel) {
        let href = link.value().attr("href").unwrap_or_default();
        let number = href.trim_start_matches("tel:").trim();
        let digits = digits_only(number);
        if number.chars().count() >= MIN_TEL_CHARS && !digits.is_empty() {
            contacts.push(item(
                ContactKind::Phone,
                digits,
                0.98,
                ExtractionMethod::HtmlTelLink,
            ));
        }
    }

    for css in CONTACT_ELEMENT_SELECTORS {
        let sel = selector(css)?;
        for element in document.select(&sel) {
            if element.value().name() == "a" {
                continue;
            }
            let text = element_text(element);
            for email in patterns.emails(&text, MAX_ELEMENT_EMAILS) {
                contacts.push(item(
                    ContactKind::Email,
                    email,
                    0.90,
                    ExtractionMethod::HtmlElementText,
                ));
            }
        }
    }

    Ok(dedupe(contacts))
}

fn dedupe(contacts: Vec<ContactItem>) -> Vec<ContactItem> {
    let mut unique: Vec<ContactItem> = Vec::with_capacity(contacts.len());
    let mut index: HashMap<(ContactKind, String), usize> = HashMap::new();

    for contact in contacts {
        let key = (contact.kind, contact.value.clone());
        match index.get(&key) {
            Some(&i) => {
                if contact.confidence > unique[i].confidence {
                    unique[i].confidence = contact.confidence;
                    unique[i].method = contact.method;
                }
            }
            None => {
                index.insert(key, unique.len());
                unique.push(contact);
            }
        }
    }

    unique
}
