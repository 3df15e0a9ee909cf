use super::*;

#[test]
fn first_offer_goes_out() {
    let mut throttle = BroadcastThrottler::new();
    assert_eq!(throttle.offer(1), Some(1));
    assert!(throttle.is_in_flight());
}

#[test]
fn offers_within_a_frame_coalesce_to_latest() {
    let mut throttle = BroadcastThrottler::new();
    assert_eq!(throttle.offer(1), Some(1));
    assert_eq!(throttle.offer(2), None);
    assert_eq!(throttle.offer(3), None);
    assert!(throttle.has_pending());

    assert_eq!(throttle.on_frame(), Some(3));
    assert!(throttle.is_in_flight());
    assert_eq!(throttle.on_frame(), None);
    assert!(!throttle.is_in_flight());
}

#[test]
fn at_most_one_message_per_frame() {
    let mut throttle = BroadcastThrottler::new();
    let mut next = 0;
    for _frame in 0..20 {
        // A frame starts at its boundary callback, then pointer moves arrive.
        let mut sent = usize::from(throttle.on_frame().is_some());
        for _ in 0..7 {
            next += 1;
            if throttle.offer(next).is_some() {
                sent += 1;
            }
        }
        assert!(sent <= 1, "sent {sent} messages in one frame");
    }
}

#[test]
fn latest_update_is_never_lost() {
    let mut throttle = BroadcastThrottler::new();
    throttle.offer("a");
    throttle.offer("b");
    throttle.offer("c");
    let mut delivered = Vec::new();
    while let Some(update) = throttle.on_frame() {
        delivered.push(update);
    }
    assert_eq!(delivered.last(), Some(&"c"));
}

#[test]
fn idle_frame_releases_the_flag() {
    let mut throttle = BroadcastThrottler::new();
    throttle.offer(1);
    assert_eq!(throttle.on_frame(), None);
    assert_eq!(throttle.offer(2), Some(2));
}

#[test]
fn reset_discards_pending() {
    let mut throttle = BroadcastThrottler::new();
    throttle.offer(1);
    throttle.offer(2);
    throttle.reset();
    assert!(!throttle.has_pending());
    assert_eq!(throttle.on_frame(), None);
}
