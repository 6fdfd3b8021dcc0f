//! Integration tests for the fairness order of the wait queue and the court pool primitives.

use chrono::{DateTime, Duration, TimeZone, Utc};
use court_rotation::models::{fairness_order, CourtPool};
use court_rotation::{PlayerId, ReleaseMode, RotationError, RotationStat, RotationStats, WaitQueue};
use std::cmp::Ordering;
use uuid::Uuid;

fn at(mins: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap() + Duration::minutes(mins)
}

fn stat(rounds: u32, mins: i64) -> RotationStat {
    RotationStat {
        completed_rounds: rounds,
        last_available_at: at(mins),
        ..RotationStat::new(at(mins))
    }
}

fn player(stats: &mut RotationStats, rounds: u32, mins: i64) -> PlayerId {
    let id = Uuid::new_v4();
    stats.insert(id, stat(rounds, mins));
    id
}

#[test]
fn zero_rounds_first_regardless_of_wait() {
    let mut stats = RotationStats::default();
    let veteran = player(&mut stats, 1, 0);
    let newcomer = player(&mut stats, 0, 90);
    assert_eq!(fairness_order(&stats, newcomer, veteran), Ordering::Less);
    assert_eq!(fairness_order(&stats, veteran, newcomer), Ordering::Greater);
}

#[test]
fn rounds_then_arrival() {
    let mut stats = RotationStats::default();
    let two_early = player(&mut stats, 2, 0);
    let one_late = player(&mut stats, 1, 30);
    let one_early = player(&mut stats, 1, 10);
    let fresh_late = player(&mut stats, 0, 50);
    let fresh_early = player(&mut stats, 0, 40);

    let mut queue = WaitQueue::new();
    for id in [two_early, one_late, one_early, fresh_late, fresh_early] {
        queue.insert(id, &stats);
    }
    assert_eq!(
        queue.ids(),
        &[fresh_early, fresh_late, one_early, one_late, two_early]
    );
}

#[test]
fn insert_ignores_duplicates_and_remove_reports_membership() {
    let mut stats = RotationStats::default();
    let a = player(&mut stats, 0, 0);
    let b = player(&mut stats, 0, 1);
    let mut queue = WaitQueue::new();
    queue.insert(a, &stats);
    queue.insert(b, &stats);
    queue.insert(a, &stats);
    assert_eq!(queue.len(), 2);
    assert!(queue.remove(a));
    assert!(!queue.remove(a));
    assert_eq!(queue.ids(), &[b]);
}

#[test]
fn reorder_follows_stat_changes_and_is_idempotent() {
    let mut stats = RotationStats::default();
    let a = player(&mut stats, 0, 0);
    let b = player(&mut stats, 0, 1);
    let mut queue = WaitQueue::new();
    queue.insert(a, &stats);
    queue.insert(b, &stats);

    stats.get_mut(a).unwrap().finish_round(at(5));
    queue.reorder(&stats);
    assert_eq!(queue.ids(), &[b, a]);
    let once = queue.clone();
    queue.reorder(&stats);
    assert_eq!(queue, once);
}

#[test]
fn peek_front_does_not_mutate() {
    let mut stats = RotationStats::default();
    let ids: Vec<_> = (0..3).map(|i| player(&mut stats, 0, i)).collect();
    let mut queue = WaitQueue::new();
    for &id in &ids {
        queue.insert(id, &stats);
    }
    assert_eq!(queue.peek_front(2), ids[..2].to_vec());
    assert_eq!(queue.peek_front(10), ids);
    assert_eq!(queue.len(), 3);
}

#[test]
fn court_pool_assign_and_release() {
    let mut stats = RotationStats::default();
    let ids: Vec<_> = (0..5).map(|i| player(&mut stats, 0, i)).collect();
    let mut pool = CourtPool::with_courts(2);

    let placed = pool.assign(1, &ids, &mut stats).unwrap();
    assert_eq!(placed, ids[..4].to_vec());
    assert!(placed.iter().all(|&id| stats.get(id).unwrap().in_progress));
    assert!(!stats.get(ids[4]).unwrap().in_progress);
    assert!(pool.assign(1, &ids[4..], &mut stats).unwrap().is_empty());
    assert_eq!(pool.court_of(ids[2]), Some(1));

    pool.toggle_mark(1, 3).unwrap();
    pool.toggle_mark(1, 1).unwrap();
    assert_eq!(pool.marked_count(1), Ok(2));
    let released = pool.release(1, ReleaseMode::Selected, &mut stats).unwrap();
    assert_eq!(released, vec![ids[1], ids[3]]);
    assert_eq!(pool.get(1).unwrap().occupants, vec![ids[0], ids[2]]);
    assert_eq!(pool.marked_count(1), Ok(0));

    assert!(matches!(
        pool.release(1, ReleaseMode::Selected, &mut stats),
        Err(RotationError::SelectionCount { marked: 0 })
    ));
    let released = pool.release(1, ReleaseMode::All, &mut stats).unwrap();
    assert_eq!(released, vec![ids[0], ids[2]]);
    assert!(pool.release(1, ReleaseMode::All, &mut stats).unwrap().is_empty());
}
