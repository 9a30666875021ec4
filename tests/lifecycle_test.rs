//! Event lifecycle integration tests
//!
//! Status transitions, staged owner edits, approval, rejection and deletion
//! against a real PostgreSQL database.

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use serial_test::serial;
use EventHub::models::{
    CreateEventRequest, EventFilter, EventStatus, NumberInput, RejectionOutcome, Role, StatusFilter,
    UpdateEventRequest,
};
use EventHub::{ErrorKind, EventHubError};

fn rename(name: &str) -> UpdateEventRequest {
    UpdateEventRequest {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
#[serial]
async fn test_initial_status_depends_on_creator_role() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, user) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let by_user = events.create_event(event_request("Meetup", 10, 5), &user).await.unwrap();
    assert_eq!(by_user.status, EventStatus::Pending);
    assert_eq!(by_user.created_by, user.id);
    assert!(by_user.pending_updates.is_none());

    let by_admin = events.create_event(event_request("Conference", 10, 5), &admin).await.unwrap();
    assert_eq!(by_admin.status, EventStatus::Approved);
    assert_eq!(by_admin.category, "General");
}

#[tokio::test]
#[serial]
async fn test_create_rejects_missing_and_malformed_fields() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, user) = ctx.create_user(Role::User).await;
    let events = &ctx.services.event_service;

    let missing = CreateEventRequest {
        name: Some("Half filled".to_string()),
        ..Default::default()
    };
    let err = events.create_event(missing, &user).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.http_status(), 400);

    let mut bad_capacity = event_request("Bad capacity", 10, 5);
    bad_capacity.capacity = Some(NumberInput::Text("plenty".to_string()));
    assert_matches!(events.create_event(bad_capacity, &user).await, Err(EventHubError::InvalidInput(_)));

    let mut bad_date = event_request("Bad date", 10, 5);
    bad_date.date = Some("2030-02-30".to_string());
    assert_matches!(events.create_event(bad_date, &user).await, Err(EventHubError::InvalidInput(_)));

    assert_eq!(ctx.database.count_records("events").await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_owner_edit_of_approved_event_waits_for_approval() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Original Name", 20, 10), &owner).await.unwrap();
    events.approve_event(event.id, &admin).await.unwrap();

    let updated = events.update_event(event.id, rename("New Name"), &owner).await.unwrap();
    assert_eq!(updated.name, "Original Name");
    assert_eq!(updated.status, EventStatus::Approved);
    assert_eq!(updated.pending().unwrap().name.as_deref(), Some("New Name"));

    let before_approval = events.get_event(event.id).await.unwrap();
    assert_eq!(before_approval.event.name, "Original Name");

    let approved = events.approve_event(event.id, &admin).await.unwrap();
    assert_eq!(approved.name, "New Name");
    assert_eq!(approved.status, EventStatus::Approved);
    assert!(approved.pending_updates.is_none());
}

#[tokio::test]
#[serial]
async fn test_staged_edits_merge_field_by_field() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Workshop", 20, 10), &owner).await.unwrap();
    events.approve_event(event.id, &admin).await.unwrap();

    events.update_event(event.id, rename("First Try"), &owner).await.unwrap();
    let second = UpdateEventRequest {
        name: Some("Second Try".to_string()),
        capacity: Some(NumberInput::Integer(40)),
        ..Default::default()
    };
    events.update_event(event.id, second, &owner).await.unwrap();
    let third = UpdateEventRequest {
        location: Some("Room 12".to_string()),
        ..Default::default()
    };
    let staged = events.update_event(event.id, third, &owner).await.unwrap();

    let patch = staged.pending().unwrap();
    assert_eq!(patch.name.as_deref(), Some("Second Try"));
    assert_eq!(patch.capacity, Some(40));
    assert_eq!(patch.location.as_deref(), Some("Room 12"));
    assert_eq!(staged.capacity, 20);

    let approved = events.approve_event(event.id, &admin).await.unwrap();
    assert_eq!(approved.name, "Second Try");
    assert_eq!(approved.capacity, 40);
    assert_eq!(approved.location, "Room 12");
    assert_eq!(approved.description, event.description);
}

#[tokio::test]
#[serial]
async fn test_owner_edits_pending_event_directly() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Draft", 20, 10), &owner).await.unwrap();
    let updated = events.update_event(event.id, rename("Draft v2"), &owner).await.unwrap();

    assert_eq!(updated.name, "Draft v2");
    assert_eq!(updated.status, EventStatus::Pending);
    assert!(updated.pending_updates.is_none());
}

#[tokio::test]
#[serial]
async fn test_admin_edit_applies_and_discards_staged_updates() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Gala", 20, 10), &owner).await.unwrap();
    events.approve_event(event.id, &admin).await.unwrap();
    events.update_event(event.id, rename("Owner Proposal"), &owner).await.unwrap();

    let admin_edit = UpdateEventRequest {
        capacity: Some(NumberInput::Integer(5)),
        ..Default::default()
    };
    let updated = events.update_event(event.id, admin_edit, &admin).await.unwrap();

    assert_eq!(updated.capacity, 5);
    assert_eq!(updated.name, "Gala");
    assert!(updated.pending_updates.is_none());
    assert_eq!(updated.status, EventStatus::Approved);
}

#[tokio::test]
#[serial]
async fn test_admin_edit_of_pending_event_applies_without_publishing() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Draft Night", 20, 10), &owner).await.unwrap();
    assert_eq!(event.status, EventStatus::Pending);

    let admin_edit = UpdateEventRequest {
        name: Some("Edited Draft".to_string()),
        capacity: Some(NumberInput::Integer(12)),
        ..Default::default()
    };
    let updated = events.update_event(event.id, admin_edit, &admin).await.unwrap();

    assert_eq!(updated.name, "Edited Draft");
    assert_eq!(updated.capacity, 12);
    assert_eq!(updated.status, EventStatus::Pending);
    assert!(updated.pending_updates.is_none());

    let stored = events.get_event(event.id).await.unwrap();
    assert_eq!(stored.event.name, "Edited Draft");
}

#[tokio::test]
#[serial]
async fn test_oversized_input_is_rejected_before_storage() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let mut long_time = event_request("Long Time", 10, 5);
    long_time.time = Some("t".repeat(71));
    let err = events.create_event(long_time, &owner).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut big_price = event_request("Big Price", 10, 5);
    big_price.price = Some(NumberInput::Integer(1_234_567_890));
    let err = events.create_event(big_price, &owner).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(ctx.database.count_records("events").await.unwrap(), 0);

    let event = events.create_event(event_request("Staged Limits", 10, 5), &owner).await.unwrap();
    events.approve_event(event.id, &admin).await.unwrap();

    let oversized = UpdateEventRequest {
        time: Some("x".repeat(80)),
        ..Default::default()
    };
    let err = events.update_event(event.id, oversized, &owner).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    events.update_event(event.id, rename("Within Limits"), &owner).await.unwrap();
    let approved = events.approve_event(event.id, &admin).await.unwrap();
    assert_eq!(approved.name, "Within Limits");
    assert_eq!(approved.status, EventStatus::Approved);
    assert!(approved.pending_updates.is_none());
}

#[tokio::test]
#[serial]
async fn test_update_requires_existing_event_and_ownership() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, stranger) = ctx.create_user(Role::User).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Private", 20, 10), &owner).await.unwrap();

    assert_matches!(
        events.update_event(event.id, rename("Hijacked"), &stranger).await,
        Err(EventHubError::PermissionDenied(_))
    );
    assert_matches!(
        events.update_event(event.id + 1000, rename("Ghost"), &owner).await,
        Err(EventHubError::EventNotFound { .. })
    );

    let unchanged = events.get_event(event.id).await.unwrap();
    assert_eq!(unchanged.event.name, "Private");
}

#[tokio::test]
#[serial]
async fn test_only_admins_approve_and_reject() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Self Approved", 20, 10), &owner).await.unwrap();

    assert_matches!(events.approve_event(event.id, &owner).await, Err(EventHubError::PermissionDenied(_)));
    assert_matches!(events.reject_event(event.id, &owner, None).await, Err(EventHubError::PermissionDenied(_)));
    assert_matches!(
        events.approve_event(event.id + 1000, &admin).await,
        Err(EventHubError::EventNotFound { .. })
    );

    let still_pending = events.get_event(event.id).await.unwrap();
    assert_eq!(still_pending.event.status, EventStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_reject_staged_updates_keeps_event_live() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Stable", 20, 10), &owner).await.unwrap();
    events.approve_event(event.id, &admin).await.unwrap();
    events.update_event(event.id, rename("Clickbait"), &owner).await.unwrap();

    let (rejected, outcome) = events
        .reject_event(event.id, &admin, Some("Misleading title".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome, RejectionOutcome::PendingUpdatesDiscarded);
    assert_eq!(rejected.status, EventStatus::Approved);
    assert_eq!(rejected.name, "Stable");
    assert!(rejected.pending_updates.is_none());
    assert_eq!(rejected.rejection_reason.as_deref(), Some("Misleading title"));
}

#[tokio::test]
#[serial]
async fn test_rejected_event_is_kept_and_resubmitted_on_edit() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Rough Draft", 20, 10), &owner).await.unwrap();
    let (rejected, outcome) = events
        .reject_event(event.id, &admin, Some("Needs an agenda".to_string()))
        .await
        .unwrap();
    assert_eq!(outcome, RejectionOutcome::EventRejected);
    assert_eq!(rejected.status, EventStatus::Rejected);
    assert_eq!(ctx.database.count_records("events").await.unwrap(), 1);

    let fix = UpdateEventRequest {
        agenda: Some("Talks, then drinks".to_string()),
        ..Default::default()
    };
    let resubmitted = events.update_event(event.id, fix, &owner).await.unwrap();
    assert_eq!(resubmitted.status, EventStatus::Pending);
    assert!(resubmitted.rejection_reason.is_none());
    assert_eq!(resubmitted.agenda.as_deref(), Some("Talks, then drinks"));

    let approved = events.approve_event(event.id, &admin).await.unwrap();
    assert_eq!(approved.status, EventStatus::Approved);
}

#[tokio::test]
#[serial]
async fn test_delete_cascades_to_bookings() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, stranger) = ctx.create_user(Role::User).await;
    let (attendee, _) = ctx.create_user(Role::User).await;
    let (other_attendee, _) = ctx.create_user(Role::User).await;
    let events = &ctx.services.event_service;
    let bookings = &ctx.services.booking_service;

    let event = events.create_event(event_request("Doomed", 10, 10), &owner).await.unwrap();
    let keeper = ctx.create_approved_event("Survivor", 10).await;
    bookings.create_booking(event.id, attendee.id).await.unwrap();
    bookings.create_booking(event.id, other_attendee.id).await.unwrap();
    bookings.create_booking(keeper.id, attendee.id).await.unwrap();

    assert_matches!(
        events.delete_event(event.id, &stranger).await,
        Err(EventHubError::PermissionDenied(_))
    );

    let removed = events.delete_event(event.id, &owner).await.unwrap();
    assert_eq!(removed, 2);
    assert_matches!(events.get_event(event.id).await, Err(EventHubError::EventNotFound { .. }));
    assert_eq!(ctx.database.count_records("bookings").await.unwrap(), 1);

    let remaining = bookings.list_user_bookings(attendee.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].event.id, keeper.id);
    assert!(bookings.list_user_bookings(other_attendee.id).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_admin_may_delete_any_event() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let event = events.create_event(event_request("Spam", 10, 10), &owner).await.unwrap();
    assert_eq!(events.delete_event(event.id, &admin).await.unwrap(), 0);
    assert_matches!(
        events.delete_event(event.id, &admin).await,
        Err(EventHubError::EventNotFound { .. })
    );
}

#[tokio::test]
#[serial]
async fn test_list_events_by_status_and_search() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let events = &ctx.services.event_service;

    let mut jazz = event_request("Jazz Night", 30, 10);
    jazz.description = Some("Live jazz quartet and dancing".to_string());
    jazz.location = Some("Blue Note Club".to_string());
    let jazz = events.create_event(jazz, &admin).await.unwrap();

    let mut rust = event_request("Systems Meetup", 30, 12);
    rust.description = Some("Talks about compilers".to_string());
    rust.location = Some("Library Hall".to_string());
    let rust = events.create_event(rust, &admin).await.unwrap();

    let pending = events.create_event(event_request("Jazz Brunch", 30, 14), &owner).await.unwrap();

    let approved = events.list_events(&EventFilter::default()).await.unwrap();
    let ids: Vec<i64> = approved.iter().map(|e| e.event.id).collect();
    assert_eq!(ids, vec![rust.id, jazz.id]);

    let all = events
        .list_events(&EventFilter { status: StatusFilter::All, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].event.id, pending.id);

    let only_pending = events
        .list_events(&EventFilter { status: StatusFilter::Only(EventStatus::Pending), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(only_pending.len(), 1);

    let found = events
        .list_events(&EventFilter { search: Some("jazz".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event.id, jazz.id);

    let by_location = events
        .list_events(&EventFilter { search: Some("library".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(by_location.len(), 1);
    assert_eq!(by_location[0].event.id, rust.id);

    let mine = events.list_events_by_creator(owner.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].event.status, EventStatus::Pending);
}

#[tokio::test]
#[serial]
async fn test_lifecycle_changes_are_broadcast() {
    let ctx = TestContext::new().await.expect("Failed to create test context");
    let (_, owner) = ctx.create_user(Role::User).await;
    let (_, admin) = ctx.create_user(Role::Admin).await;
    let mut updates = ctx.subscribe();

    let event = ctx
        .services
        .event_service
        .create_event(event_request("Announced", 10, 10), &owner)
        .await
        .unwrap();
    let created = next_broadcast(&mut updates, "eventUpdated").await.expect("no create broadcast");
    assert_eq!(created.payload["eventId"], event.id);
    assert_eq!(created.payload["status"], "pending");

    ctx.services.event_service.approve_event(event.id, &admin).await.unwrap();
    let approved = next_broadcast(&mut updates, "eventUpdated").await.expect("no approve broadcast");
    assert_eq!(approved.payload["status"], "approved");
}
