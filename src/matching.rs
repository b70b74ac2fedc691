/// Try each candidate in order and return the first successful result along
/// with the reordered candidate list, where the winner has been spliced to
/// position 0 and every other candidate keeps its relative order.
///
/// When nothing matches the order is returned unchanged.
pub fn try_in_order<T, R, F>(mut candidates: Vec<T>, mut attempt: F) -> (Option<R>, Vec<T>)
where
    F: FnMut(&T) -> Option<R>,
{
    let result = promote_first_match(&mut candidates, &mut attempt);
    (result, candidates)
}

fn promote_first_match<T, R, F>(candidates: &mut [T], attempt: &mut F) -> Option<R>
where
    F: FnMut(&T) -> Option<R>,
{
    for index in 0..candidates.len() {
        if let Some(result) = attempt(&candidates[index]) {
            candidates[..=index].rotate_right(1);
            return Some(result);
        }
    }
    None
}

/// A self-reordering candidate list.
///
/// Within a single log file nearly every line shares one format revision, so
/// promoting the last winner makes later lookups hit on the first attempt.
/// Instances are meant to be private to one file-processing task.
#[derive(Debug, Clone)]
pub struct MoveToFront<T> {
    candidates: Vec<T>,
}

impl<T> MoveToFront<T> {
    pub fn new(candidates: Vec<T>) -> Self {
        Self { candidates }
    }

    /// Run `attempt` against each candidate; the first one returning `Some`
    /// is moved to the front.
    pub fn try_match<R, F>(&mut self, mut attempt: F) -> Option<R>
    where
        F: FnMut(&T) -> Option<R>,
    {
        promote_first_match(&mut self.candidates, &mut attempt)
    }

    /// Current candidate order, most recent winner first.
    pub fn order(&self) -> &[T] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn starts_with<'a>(prefix: &'a str) -> impl FnMut(&&'static str) -> Option<&'static str> + 'a {
        move |candidate: &&'static str| candidate.starts_with(prefix).then_some(*candidate)
    }

    #[test]
    fn test_winner_moves_to_front() {
        let (result, order) = try_in_order(vec!["alpha", "beta", "gamma"], starts_with("g"));
        assert_eq!(result, Some("gamma"));
        assert_eq!(order, vec!["gamma", "alpha", "beta"]);
    }

    #[test]
    fn test_first_candidate_keeps_order() {
        let (result, order) = try_in_order(vec!["alpha", "beta", "gamma"], starts_with("a"));
        assert_eq!(result, Some("alpha"));
        assert_eq!(order, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_no_match_leaves_order_untouched() {
        let (result, order) = try_in_order(vec!["alpha", "beta"], starts_with("z"));
        assert!(result.is_none());
        assert_eq!(order, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_middle_winner_preserves_relative_order_of_others() {
        let mut list = MoveToFront::new(vec![1, 2, 3, 4]);
        assert_eq!(list.try_match(|n| (*n == 3).then_some(*n * 10)), Some(30));
        assert_eq!(list.order(), &[3, 1, 2, 4]);

        // Subsequent hit on the same candidate is found on the first attempt
        let mut attempts = 0;
        list.try_match(|n| {
            attempts += 1;
            (*n == 3).then_some(())
        });
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_empty_list() {
        let mut list: MoveToFront<u8> = MoveToFront::new(Vec::new());
        assert!(list.is_empty());
        assert_eq!(list.try_match(|_| Some(())), None);
    }
}
