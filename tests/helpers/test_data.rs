//! Test data helpers for creating test objects
//!
//! Users and event requests are filled with generated data so each test only
//! spells out the fields it cares about.

use chrono::{Duration, NaiveDate, Utc};
use fake::faker::address::en::CityName;
use fake::faker::lorem::en::Sentence;
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;
use EventHub::models::{CreateEventRequest, CreateUserRequest, NumberInput, Role};

/// A user request with a generated name and a unique email
pub fn user_request(role: Role) -> CreateUserRequest {
    let name: String = Name().fake();
    let email = format!("user-{}@example.com", Uuid::new_v4().simple());

    CreateUserRequest {
        name,
        email,
        role: Some(role),
    }
}

/// A valid event request dated `days_ahead` days from today
pub fn event_request(name: &str, capacity: i64, days_ahead: i64) -> CreateEventRequest {
    event_request_on(name, capacity, Utc::now().date_naive() + Duration::days(days_ahead))
}

/// A valid event request on a given date
pub fn event_request_on(name: &str, capacity: i64, date: NaiveDate) -> CreateEventRequest {
    let description: String = Sentence(4..10).fake();
    let location: String = CityName().fake();

    CreateEventRequest {
        name: Some(name.to_string()),
        description: Some(description),
        date: Some(date.format("%Y-%m-%d").to_string()),
        time: Some("18:30".to_string()),
        location: Some(location),
        capacity: Some(NumberInput::Integer(capacity)),
        price: None,
        category: None,
        agenda: None,
        tags: vec!["community".to_string()],
        image: None,
    }
}
