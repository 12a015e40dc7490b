mod common;

use booking_assistant::domain::models::business::Business;
use booking_assistant::domain::ports::IntentRouter;
use booking_assistant::domain::services::intent::{parse_date, parse_time, Intent, RuleBasedIntentRouter};
use chrono::NaiveDate;
use common::{date, salon_params, time};

fn today() -> NaiveDate {
    date("2030-03-10")
}

async fn route(text: &str) -> Intent {
    RuleBasedIntentRouter::new().route(&Business::new(salon_params()), text, today()).await
}

#[test]
fn test_date_forms() {
    assert_eq!(parse_date("free slots on 2030-03-11?", today()), Some(date("2030-03-11")));
    assert_eq!(parse_date("il 11/03/2030 va bene", today()), Some(date("2030-03-11")));
    assert_eq!(parse_date("Tomorrow please", today()), Some(date("2030-03-11")));
    assert_eq!(parse_date("oggi", today()), Some(today()));
    assert_eq!(parse_date("next week maybe", today()), None);
}

#[test]
fn test_time_forms() {
    assert_eq!(parse_time("at 14:30"), Some(time("14:30")));
    assert_eq!(parse_time("alle 9.15"), Some(time("09:15")));
    assert_eq!(parse_time("tomorrow at 10"), Some(time("10:00")));
    assert_eq!(parse_time("domani alle 17"), Some(time("17:00")));
    assert_eq!(parse_time("at 25"), None);
    assert_eq!(parse_time("2030-03-11"), None);
}

#[tokio::test]
async fn test_book_intent_english_and_italian() {
    assert_eq!(
        route("I'd like to book a haircut tomorrow at 10:30").await,
        Intent::Book { service: Some("Haircut".into()), date: Some(date("2030-03-11")), time: Some(time("10:30")) }
    );
    assert_eq!(
        route("Vorrei prenotare beard trim domani alle 15").await,
        Intent::Book { service: Some("Beard Trim".into()), date: Some(date("2030-03-11")), time: Some(time("15:00")) }
    );
}

#[tokio::test]
async fn test_book_intent_with_missing_parts() {
    assert_eq!(
        route("book please").await,
        Intent::Book { service: None, date: None, time: None }
    );
}

#[tokio::test]
async fn test_availability_intent() {
    assert_eq!(
        route("Any free slots for a haircut on 2030-03-12?").await,
        Intent::QueryAvailability { service: Some("Haircut".into()), date: Some(date("2030-03-12")) }
    );
    assert_eq!(
        route("Che orari sono disponibili domani?").await,
        Intent::QueryAvailability { service: None, date: Some(date("2030-03-11")) }
    );
}

#[tokio::test]
async fn test_cancel_wins_over_other_keywords() {
    assert_eq!(route("Please cancel my booking tomorrow at 10").await, Intent::Cancel);
    assert_eq!(route("Vorrei annullare l'appuntamento").await, Intent::Cancel);
}

#[tokio::test]
async fn test_modify_intent() {
    assert_eq!(
        route("Can I move my appointment to 2030-03-12 at 16:00?").await,
        Intent::Modify { date: Some(date("2030-03-12")), time: Some(time("16:00")) }
    );
    assert_eq!(
        route("spostare a domani alle 11").await,
        Intent::Modify { date: Some(date("2030-03-11")), time: Some(time("11:00")) }
    );
}

#[tokio::test]
async fn test_info_and_unknown() {
    assert_eq!(route("What is your address?").await, Intent::Info);
    assert_eq!(route("Dove siete?").await, Intent::Info);
    assert_eq!(route("ciao!").await, Intent::Unknown);
}

#[tokio::test]
async fn test_bare_date_and_time_books_the_only_service() {
    let mut params = salon_params();
    params.services.truncate(1);
    let business = Business::new(params);

    let intent = RuleBasedIntentRouter::new().route(&business, "2030-03-11 at 09:00", today()).await;
    assert_eq!(
        intent,
        Intent::Book { service: Some("Haircut".into()), date: Some(date("2030-03-11")), time: Some(time("09:00")) }
    );
}
