use super::daily_task::DailyTask;
use super::project::Project;
use super::task::Task;

/// Anything that lives in an ordered, id-addressed collection.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Project {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for DailyTask {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Move `dragged` so it sits directly before `target`.
///
/// Does nothing when the ids are equal or either is missing. Returns whether
/// the order changed.
pub fn reorder<T: Identified>(items: &mut Vec<T>, dragged: &str, target: &str) -> bool {
    if dragged == target {
        return false;
    }
    let Some(from) = items.iter().position(|item| item.id() == dragged) else {
        return false;
    };
    if !items.iter().any(|item| item.id() == target) {
        return false;
    }

    let item = items.remove(from);
    let to = items
        .iter()
        .position(|i| i.id() == target)
        .unwrap_or(items.len());
    items.insert(to, item);
    to != from
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Card(&'static str);

    impl Identified for Card {
        fn id(&self) -> &str {
            self.0
        }
    }

    fn cards(ids: &[&'static str]) -> Vec<Card> {
        ids.iter().map(|id| Card(*id)).collect()
    }

    fn ids(items: &[Card]) -> Vec<&str> {
        items.iter().map(|c| c.0).collect()
    }

    #[test]
    fn moves_before_target() {
        let mut items = cards(&["A", "B", "C", "D"]);
        assert!(reorder(&mut items, "D", "B"));
        assert_eq!(ids(&items), ["A", "D", "B", "C"]);
    }

    #[test]
    fn moving_forward_lands_before_target() {
        let mut items = cards(&["A", "B", "C", "D"]);
        assert!(reorder(&mut items, "A", "C"));
        assert_eq!(ids(&items), ["B", "A", "C", "D"]);
    }

    #[test]
    fn same_id_is_noop() {
        let mut items = cards(&["A", "B", "C"]);
        assert!(!reorder(&mut items, "B", "B"));
        assert_eq!(ids(&items), ["A", "B", "C"]);
    }

    #[test]
    fn unknown_ids_are_noop() {
        let mut items = cards(&["A", "B", "C"]);
        assert!(!reorder(&mut items, "X", "B"));
        assert!(!reorder(&mut items, "A", "X"));
        assert_eq!(ids(&items), ["A", "B", "C"]);
    }

    #[test]
    fn dropping_on_next_neighbour_keeps_order() {
        let mut items = cards(&["A", "B", "C"]);
        assert!(!reorder(&mut items, "A", "B"));
        assert_eq!(ids(&items), ["A", "B", "C"]);
    }
}
