//! Break point detection for chunking

use std::cmp::Reverse;

/// Priority levels for break points
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BreakPriority {
    /// Word boundary (lowest)
    Word = 1,
    /// Sentence boundary
    Sentence = 2,
    /// Single line break
    Line = 3,
    /// Paragraph boundary (highest)
    Paragraph = 4,
}

/// A potential break point in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakPoint {
    /// Character position where the next chunk would start
    pub position: usize,
    /// Priority of this break point
    pub priority: BreakPriority,
}

impl BreakPoint {
    pub fn new(position: usize, priority: BreakPriority) -> Self {
        Self { position, priority }
    }
}

/// Find every break point in `chars`, one per position, sorted by position.
///
/// When several rules match the same position the highest priority wins.
pub fn find_break_points(chars: &[char]) -> Vec<BreakPoint> {
    let n = chars.len();
    let mut points = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();

        if c == '\n' {
            if next == Some('\n') {
                points.push(BreakPoint::new(i + 2, BreakPriority::Paragraph));
            }
            points.push(BreakPoint::new(i + 1, BreakPriority::Line));
        }

        if matches!(c, '.' | '?' | '!') && next.is_some_and(char::is_whitespace) {
            points.push(BreakPoint::new(i + 2, BreakPriority::Sentence));
        }

        if c.is_whitespace() {
            points.push(BreakPoint::new(i + 1, BreakPriority::Word));
        }
    }

    points.retain(|p| p.position <= n);
    points.sort_by_key(|p| (p.position, Reverse(p.priority)));
    points.dedup_by_key(|p| p.position);
    points
}

/// Pick the best break in `min_pos..=max_pos`: highest priority, latest position.
pub fn best_break(points: &[BreakPoint], min_pos: usize, max_pos: usize) -> Option<usize> {
    let lo = points.partition_point(|p| p.position < min_pos);
    let hi = points.partition_point(|p| p.position <= max_pos);

    points[lo..hi.max(lo)]
        .iter()
        .max_by_key(|p| (p.priority, p.position))
        .map(|p| p.position)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_break_priority_ordering() {
        assert!(BreakPriority::Paragraph > BreakPriority::Line);
        assert!(BreakPriority::Line > BreakPriority::Sentence);
        assert!(BreakPriority::Sentence > BreakPriority::Word);
    }

    #[test]
    fn test_find_break_points_keeps_highest_priority() {
        let points = find_break_points(&chars("Hi. A\n\nB"));

        assert_eq!(
            points,
            vec![
                BreakPoint::new(4, BreakPriority::Sentence),
                BreakPoint::new(6, BreakPriority::Line),
                BreakPoint::new(7, BreakPriority::Paragraph),
            ]
        );
    }

    #[test]
    fn test_best_break_prefers_priority_then_position() {
        let points = vec![
            BreakPoint::new(3, BreakPriority::Word),
            BreakPoint::new(5, BreakPriority::Sentence),
            BreakPoint::new(8, BreakPriority::Word),
            BreakPoint::new(9, BreakPriority::Sentence),
        ];

        assert_eq!(best_break(&points, 2, 10), Some(9));
        assert_eq!(best_break(&points, 6, 8), Some(8));
        assert_eq!(best_break(&points, 10, 20), None);
    }
}
