#![allow(clippy::float_cmp)]

use super::test_helpers::*;
use super::*;

#[test]
fn new_groups_append_per_zone() {
    let mut meeting = MeetingState::new();
    let a = meeting.create_group("start");
    let b = meeting.create_group("start");
    let c = meeting.create_group("stop");

    assert_eq!(meeting.groups[&a].sort_order, 0.0);
    assert_eq!(meeting.groups[&b].sort_order, 1.0);
    assert_eq!(meeting.groups[&c].sort_order, 0.0);
}

#[test]
fn snapshot_is_ordered() {
    let mut meeting = MeetingState::new();
    let first = meeting.create_group("start");
    let second = meeting.create_group("start");
    let snap = meeting.snapshot();
    let ids: Vec<Uuid> = snap.groups.iter().map(|g| g.id).collect();
    assert_eq!(ids, vec![first, second]);
    assert!(snap.reflections.is_empty());
}

#[tokio::test]
async fn seeded_reflection_is_alone_in_its_group() {
    let state = test_app_state();
    let meeting_id = seed_meeting(&state).await;
    let (card, group) = seed_reflection(&state, meeting_id, "start").await;

    let meetings = state.meetings.read().await;
    let meeting = &meetings[&meeting_id];
    let members: Vec<Uuid> = meeting.group_members(group).map(|r| r.id).collect();
    assert_eq!(members, vec![card]);
    assert_eq!(meeting.next_reflection_order(group), 1.0);
}
