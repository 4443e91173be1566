use std::collections::HashSet;

use uuid::Uuid;

use crate::models::CalledTicket;

/// Tracks which ticket ids have ever appeared in a rendered sequence. The
/// set only grows within a session, so a ticket is announced at most once
/// no matter how snapshots and push events interleave (a poll may regress
/// to a list that predates a pushed ticket; the set does not).
#[derive(Debug, Default)]
pub struct AnnounceTracker {
    seen: HashSet<Uuid>,
}

impl AnnounceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares a fresh ticket sequence against everything seen so far.
    /// Returns the unseen tickets in sequence order (most recent first),
    /// then absorbs the whole sequence: ids reported once are never
    /// reported again.
    pub fn diff<'a>(&mut self, tickets: &'a [CalledTicket]) -> Vec<&'a CalledTicket> {
        let fresh: Vec<&CalledTicket> = tickets
            .iter()
            .filter(|ticket| !self.seen.contains(&ticket.id))
            .collect();
        self.seen.extend(tickets.iter().map(|ticket| ticket.id));
        fresh
    }

    /// The single ticket to speak for this round: the head of the fresh
    /// list. The rest are absorbed silently, so a missed interval never
    /// produces a backlog of announcements.
    pub fn next_announcement<'a>(&mut self, tickets: &'a [CalledTicket]) -> Option<&'a CalledTicket> {
        self.diff(tickets).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures;

    fn numbers(tickets: &[&CalledTicket]) -> Vec<String> {
        tickets.iter().map(|t| t.display_number.clone()).collect()
    }

    #[test]
    fn reports_only_unseen_tickets_in_sequence_order() {
        let mut tracker = AnnounceTracker::new();

        let t1 = fixtures::ticket(1, "A001");
        assert_eq!(numbers(&tracker.diff(&[t1.clone()])), vec!["A001"]);

        let t2 = fixtures::ticket(2, "A002");
        let t3 = fixtures::ticket(3, "A003");
        let sequence = [t3.clone(), t2.clone(), t1.clone()];
        let fresh = tracker.diff(&sequence);
        assert_eq!(numbers(&fresh), vec!["A003", "A002"]);
    }

    #[test]
    fn a_ticket_never_comes_back() {
        let mut tracker = AnnounceTracker::new();
        let t1 = fixtures::ticket(1, "A001");
        let t2 = fixtures::ticket(2, "A002");

        tracker.diff(&[t2.clone(), t1.clone()]);
        // t1 reappears after a refetch raced a push event.
        assert!(tracker.diff(&[t1.clone()]).is_empty());
        assert!(tracker.diff(&[t2.clone(), t1.clone()]).is_empty());
    }

    #[test]
    fn skipped_tickets_are_still_absorbed() {
        let mut tracker = AnnounceTracker::new();
        let t1 = fixtures::ticket(1, "A001");
        let t2 = fixtures::ticket(2, "A002");
        let t3 = fixtures::ticket(3, "A003");

        // Two tickets arrive in one diff after a missed interval; only the
        // head is spoken, but both count as seen.
        let batch = [t3.clone(), t2.clone(), t1.clone()];
        let spoken = tracker.next_announcement(&batch);
        assert_eq!(spoken.map(|t| t.display_number.as_str()), Some("A003"));
        assert!(tracker.diff(&[t2, t1]).is_empty());
    }

    #[test]
    fn successive_snapshots_each_announce_their_head_once() {
        let mut tracker = AnnounceTracker::new();
        let t1 = fixtures::ticket(1, "A001");
        let t2 = fixtures::ticket(2, "A002");
        let t3 = fixtures::ticket(3, "A003");

        let first = tracker.next_announcement(std::slice::from_ref(&t1));
        assert_eq!(first.map(|t| t.display_number.as_str()), Some("A001"));

        let second_batch = [t2.clone(), t1.clone()];
        let second = tracker.next_announcement(&second_batch);
        assert_eq!(second.map(|t| t.display_number.as_str()), Some("A002"));

        let third_batch = [t3, t2, t1];
        let third = tracker.next_announcement(&third_batch);
        assert_eq!(third.map(|t| t.display_number.as_str()), Some("A003"));
    }
}
