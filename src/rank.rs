//! Display ordering of the deduplicated feed.
//!
//! Upcoming deadlines come first (soonest first), then expired ones (most
//! recently expired first), then records without a known deadline. Ties
//! fall to the deadline string and then to the more trusted source.

use crate::models::Notice;
use std::cmp::Reverse;

const MAX_DEADLINE: &str = "9999-12-31";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Urgency {
    Upcoming(i64),
    Expired(Reverse<i64>),
    Undated,
}

impl Urgency {
    fn of(dday: Option<i64>) -> Self {
        match dday {
            Some(d) if d >= 0 => Urgency::Upcoming(d),
            Some(d) => Urgency::Expired(Reverse(d)),
            None => Urgency::Undated,
        }
    }
}

fn rank_key(notice: &Notice) -> (Urgency, &str, Reverse<u8>) {
    let deadline = if notice.deadline.is_empty() {
        MAX_DEADLINE
    } else {
        notice.deadline.as_str()
    };
    (
        Urgency::of(notice.dday),
        deadline,
        Reverse(notice.source.priority()),
    )
}

/// Sort `notices` into display order. The sort is stable.
pub fn rank(notices: &mut [Notice]) {
    notices.sort_by(|a, b| rank_key(a).cmp(&rank_key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;

    fn notice(source: Source, id: &str, deadline: &str, dday: Option<i64>) -> Notice {
        let mut n = Notice::new(source, id, id, "c", "u");
        n.deadline = deadline.to_string();
        n.dday = dday;
        n
    }

    fn ids(notices: &[Notice]) -> Vec<&str> {
        notices.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_soonest_first() {
        let mut v = vec![
            notice(Source::Iris, "ten", "2024-03-11", Some(10)),
            notice(Source::Iris, "three", "2024-03-04", Some(3)),
            notice(Source::Iris, "zero", "2024-03-01", Some(0)),
        ];
        rank(&mut v);
        assert_eq!(ids(&v), vec!["i-zero", "i-three", "i-ten"]);
    }

    #[test]
    fn test_expired_between_upcoming_and_undated() {
        let mut v = vec![
            notice(Source::Gosims, "undated", "", None),
            notice(Source::Iris, "old", "2024-01-01", Some(-60)),
            notice(Source::Iris, "yesterday", "2024-02-29", Some(-1)),
            notice(Source::Iris, "later", "2024-12-31", Some(305)),
        ];
        rank(&mut v);
        assert_eq!(
            ids(&v),
            vec!["i-later", "i-yesterday", "i-old", "g-undated"]
        );
    }

    #[test]
    fn test_source_priority_breaks_ties() {
        let mut v = vec![
            notice(Source::Iris, "a", "2024-03-05", Some(4)),
            notice(Source::Smtech, "b", "2024-03-05", Some(4)),
            notice(Source::Gosims, "c", "2024-03-05", Some(4)),
        ];
        rank(&mut v);
        assert_eq!(ids(&v), vec!["g-c", "smt-b", "i-a"]);
    }

    #[test]
    fn test_undated_ordered_by_priority() {
        let mut v = vec![
            notice(Source::KStartup, "k", "", None),
            notice(Source::Gosims, "g", "", None),
        ];
        rank(&mut v);
        assert_eq!(ids(&v), vec!["g-g", "k-k"]);
    }
}
