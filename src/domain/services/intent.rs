use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveTime};

use crate::domain::models::business::Business;
use crate::domain::ports::IntentRouter;

/// What a chat message asks the core to do. Missing parameters stay `None`
/// so the assistant can ask for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    QueryAvailability { service: Option<String>, date: Option<NaiveDate> },
    Book { service: Option<String>, date: Option<NaiveDate>, time: Option<NaiveTime> },
    Modify { date: Option<NaiveDate>, time: Option<NaiveTime> },
    Cancel,
    Info,
    Unknown,
}

const CANCEL_STEMS: &[&str] = &["cancel", "annull", "disdi"];
const MODIFY_STEMS: &[&str] = &["modif", "change", "move", "resched", "spost", "cambi"];
const BOOK_STEMS: &[&str] = &["book", "reserv", "prenot", "appointment", "appuntament"];
const AVAILABILITY_STEMS: &[&str] = &["availab", "disponib", "free", "liber", "slot"];
const INFO_STEMS: &[&str] = &[
    "info", "address", "indirizz", "hour", "orari", "where", "dove", "servic", "serviz",
    "phone", "telefon", "contact", "contatt",
];

/// Keyword router for English and Italian messages.
#[derive(Debug, Default, Clone)]
pub struct RuleBasedIntentRouter;

impl RuleBasedIntentRouter {
    pub fn new() -> Self {
        Self
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn mentions(words: &[String], stems: &[&str]) -> bool {
    words.iter().any(|w| stems.iter().any(|s| w.starts_with(s)))
}

fn raw_tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| matches!(c, ',' | '?' | '!' | ';' | '(' | ')' | '"' | '\''))
                .trim_end_matches('.')
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    for token in raw_tokens(text) {
        match token.as_str() {
            "today" | "oggi" => return Some(today),
            "tomorrow" | "domani" => return Some(today + Duration::days(1)),
            _ => {}
        }
        if let Ok(date) = NaiveDate::parse_from_str(&token, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(date) = NaiveDate::parse_from_str(&token, "%d/%m/%Y") {
            return Some(date);
        }
    }
    None
}

pub fn parse_time(text: &str) -> Option<NaiveTime> {
    let tokens = raw_tokens(text);
    for (i, token) in tokens.iter().enumerate() {
        if token.contains(':') || token.contains('.') {
            let parsed = NaiveTime::parse_from_str(token, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(token, "%H.%M"));
            if let Ok(time) = parsed {
                return Some(time);
            }
        }
        if matches!(token.as_str(), "at" | "alle" | "ore")
            && let Some(next) = tokens.get(i + 1)
            && let Ok(hour) = next.parse::<u32>()
            && let Some(time) = NaiveTime::from_hms_opt(hour, 0, 0)
        {
            return Some(time);
        }
    }
    None
}

/// Longest service name mentioned in the text, or the only service there is.
pub fn parse_service(business: &Business, text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let mentioned = business
        .services
        .iter()
        .filter(|s| lowered.contains(&s.name.to_lowercase()))
        .max_by_key(|s| s.name.len());

    match mentioned {
        Some(service) => Some(service.name.clone()),
        None if business.services.len() == 1 => Some(business.services[0].name.clone()),
        None => None,
    }
}

#[async_trait]
impl IntentRouter for RuleBasedIntentRouter {
    async fn route(&self, business: &Business, text: &str, today: NaiveDate) -> Intent {
        let words = words(text);

        if mentions(&words, CANCEL_STEMS) {
            return Intent::Cancel;
        }

        let date = parse_date(text, today);
        let time = parse_time(text);

        if mentions(&words, MODIFY_STEMS) {
            return Intent::Modify { date, time };
        }
        if mentions(&words, AVAILABILITY_STEMS) {
            return Intent::QueryAvailability { service: parse_service(business, text), date };
        }
        if mentions(&words, BOOK_STEMS) {
            return Intent::Book { service: parse_service(business, text), date, time };
        }
        if mentions(&words, INFO_STEMS) {
            return Intent::Info;
        }
        if date.is_some() {
            return match time {
                Some(_) => Intent::Book { service: parse_service(business, text), date, time },
                None => Intent::QueryAvailability { service: parse_service(business, text), date },
            };
        }
        Intent::Unknown
    }
}
