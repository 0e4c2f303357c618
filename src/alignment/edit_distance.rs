use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditKind {
    Match,
    Substitute,
    Delete,
    Insert,
}

/// One step of the edit script turning `a` into `b`.
///
/// `position` indexes `a`; for `Insert` it is the index in `a` before which
/// the element of `b` is inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOperation<T> {
    pub kind: EditKind,
    pub position: usize,
    pub a: Option<T>,
    pub b: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhonemeAccuracy {
    pub accuracy: f64,
    pub substitutions: usize,
    pub deletions: usize,
    pub insertions: usize,
    pub total_errors: usize,
    pub total_expected: usize,
}

/// Unit-cost Levenshtein distance.
pub fn edit_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (x, item_a) in a.iter().enumerate() {
        curr[0] = x + 1;
        for (y, item_b) in b.iter().enumerate() {
            let diag = if item_a == item_b { prev[y] } else { prev[y] + 1 };
            curr[y + 1] = diag.min(prev[y + 1] + 1).min(curr[y] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Distance divided by the longer length, in `[0, 1]`. Two empty inputs are identical.
pub fn normalized_distance<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 0.0;
    }
    edit_distance(a, b) as f64 / max_len as f64
}

pub fn similarity<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    1.0 - normalized_distance(a, b)
}

/// Full DP table, `(|a|+1) x (|b|+1)`, row-major.
fn distance_table<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Vec<usize>> {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (x, row) in table.iter_mut().enumerate() {
        row[0] = x;
    }
    for y in 0..=b.len() {
        table[0][y] = y;
    }
    for x in 1..=a.len() {
        for y in 1..=b.len() {
            table[x][y] = if a[x - 1] == b[y - 1] {
                table[x - 1][y - 1]
            } else {
                (table[x - 1][y] + 1)
                    .min(table[x - 1][y - 1] + 1)
                    .min(table[x][y - 1] + 1)
            };
        }
    }
    table
}

/// Minimal edit script from `a` to `b`, in forward order.
///
/// When several scripts are minimal, backtracking prefers
/// match > substitute > delete > insert at every step.
pub fn edit_operations<T: PartialEq + Clone>(a: &[T], b: &[T]) -> Vec<EditOperation<T>> {
    let table = distance_table(a, b);
    let mut ops = Vec::with_capacity(a.len().max(b.len()));
    let (mut x, mut y) = (a.len(), b.len());

    while x > 0 || y > 0 {
        if x > 0 && y > 0 && a[x - 1] == b[y - 1] {
            ops.push(EditOperation {
                kind: EditKind::Match,
                position: x - 1,
                a: Some(a[x - 1].clone()),
                b: Some(b[y - 1].clone()),
            });
            x -= 1;
            y -= 1;
        } else if x > 0 && y > 0 && table[x][y] == table[x - 1][y - 1] + 1 {
            ops.push(EditOperation {
                kind: EditKind::Substitute,
                position: x - 1,
                a: Some(a[x - 1].clone()),
                b: Some(b[y - 1].clone()),
            });
            x -= 1;
            y -= 1;
        } else if x > 0 && table[x][y] == table[x - 1][y] + 1 {
            ops.push(EditOperation {
                kind: EditKind::Delete,
                position: x - 1,
                a: Some(a[x - 1].clone()),
                b: None,
            });
            x -= 1;
        } else {
            ops.push(EditOperation {
                kind: EditKind::Insert,
                position: x,
                a: None,
                b: Some(b[y - 1].clone()),
            });
            y -= 1;
        }
    }

    ops.reverse();
    ops
}

pub fn str_edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    edit_distance(&a, &b)
}

pub fn str_normalized_distance(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    normalized_distance(&a, &b)
}

pub fn str_similarity(a: &str, b: &str) -> f64 {
    1.0 - str_normalized_distance(a, b)
}

pub fn str_edit_operations(a: &str, b: &str) -> Vec<EditOperation<char>> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    edit_operations(&a, &b)
}

/// Character-level accuracy of `actual` against `expected`, in percent.
pub fn word_accuracy(expected: &str, actual: &str) -> f64 {
    let expected = expected.trim().to_lowercase();
    let actual = actual.trim().to_lowercase();
    if expected.is_empty() {
        return if actual.is_empty() { 100.0 } else { 0.0 };
    }

    let expected: Vec<char> = expected.chars().collect();
    let actual: Vec<char> = actual.chars().collect();
    let max_len = expected.len().max(actual.len());
    let distance = edit_distance(&expected, &actual);
    ((1.0 - distance as f64 / max_len as f64) * 100.0).max(0.0)
}

/// Accuracy of a phoneme sequence, counting edit operations per phoneme token.
pub fn phoneme_accuracy<S: AsRef<str>>(expected: &[S], actual: &[S]) -> PhonemeAccuracy {
    let expected: Vec<&str> = expected.iter().map(AsRef::as_ref).collect();
    let actual: Vec<&str> = actual.iter().map(AsRef::as_ref).collect();

    let mut substitutions = 0usize;
    let mut deletions = 0usize;
    let mut insertions = 0usize;
    for op in edit_operations(&expected, &actual) {
        match op.kind {
            EditKind::Substitute => substitutions += 1,
            EditKind::Delete => deletions += 1,
            EditKind::Insert => insertions += 1,
            EditKind::Match => {}
        }
    }

    let total_errors = substitutions + deletions + insertions;
    let total_expected = expected.len();
    let accuracy = if total_expected == 0 {
        0.0
    } else {
        ((1.0 - total_errors as f64 / total_expected as f64) * 100.0).max(0.0)
    };

    PhonemeAccuracy {
        accuracy,
        substitutions,
        deletions,
        insertions,
        total_errors,
        total_expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn kinds(ops: &[EditOperation<char>]) -> Vec<EditKind> {
        ops.iter().map(|op| op.kind).collect()
    }

    #[test]
    fn distance_of_classic_pairs() {
        assert_eq!(str_edit_distance("kitten", "sitting"), 3);
        assert_eq!(str_edit_distance("", "abc"), 3);
        assert_eq!(str_edit_distance("abc", ""), 3);
        assert_eq!(str_edit_distance("sells", "sell"), 1);
        assert_eq!(str_edit_distance("flaw", "lawn"), 2);
    }

    #[test]
    fn distance_counts_chars_not_bytes() {
        assert_eq!(str_edit_distance("café", "cafe"), 1);
        assert_eq!(str_normalized_distance("é", "e"), 1.0);
    }

    #[test]
    fn normalized_distance_of_empty_inputs_is_zero() {
        assert_eq!(str_normalized_distance("", ""), 0.0);
        assert_eq!(str_similarity("", ""), 1.0);
    }

    #[test]
    fn similarity_of_one_edit_in_four() {
        assert!((str_similarity("cats", "bats") - 0.75).abs() < 1e-12);
    }

    #[test]
    fn operations_for_identical_words_are_all_matches() {
        let ops = str_edit_operations("cat", "cat");
        assert_eq!(kinds(&ops), vec![EditKind::Match; 3]);
    }

    #[test]
    fn operations_single_substitution_at_start() {
        let ops = str_edit_operations("cat", "bat");
        assert_eq!(
            kinds(&ops),
            vec![EditKind::Substitute, EditKind::Match, EditKind::Match]
        );
        assert_eq!(ops[0].position, 0);
        assert_eq!(ops[0].a, Some('c'));
        assert_eq!(ops[0].b, Some('b'));
    }

    #[test]
    fn operations_trailing_deletion() {
        let ops = str_edit_operations("sells", "sell");
        assert_eq!(ops.len(), 5);
        let last = ops.last().unwrap();
        assert_eq!(last.kind, EditKind::Delete);
        assert_eq!(last.position, 4);
        assert_eq!(last.b, None);
    }

    #[test]
    fn operations_insertion_position_points_into_a() {
        let ops = str_edit_operations("at", "cat");
        assert_eq!(ops[0].kind, EditKind::Insert);
        assert_eq!(ops[0].position, 0);
        assert_eq!(ops[0].b, Some('c'));
        assert_eq!(kinds(&ops[1..]), vec![EditKind::Match, EditKind::Match]);
    }

    #[test]
    fn operations_prefer_substitute_over_delete_insert() {
        // "ab" -> "ba": two substitutions and delete+insert pairs are all cost 2.
        let ops = str_edit_operations("ab", "ba");
        assert_eq!(ops.len(), 2);
        assert!(ops.iter().all(|op| op.kind == EditKind::Substitute));
    }

    #[test]
    fn operations_on_empty_inputs() {
        assert!(str_edit_operations("", "").is_empty());
        assert_eq!(kinds(&str_edit_operations("ab", "")), vec![EditKind::Delete; 2]);
        assert_eq!(kinds(&str_edit_operations("", "ab")), vec![EditKind::Insert; 2]);
    }

    #[test]
    fn word_accuracy_edges() {
        assert_eq!(word_accuracy("", ""), 100.0);
        assert_eq!(word_accuracy("", "x"), 0.0);
        assert_eq!(word_accuracy(" Hello ", "hello"), 100.0);
        assert!((word_accuracy("sells", "sell") - 80.0).abs() < 1e-9);
        assert_eq!(word_accuracy("ab", "xyzw"), 0.0);
    }

    #[test]
    fn phoneme_accuracy_counts_tokens() {
        let expected = ["DH", "AH", "K", "AE", "T"];
        let actual = ["D", "AH", "K", "AE"];
        let result = phoneme_accuracy(&expected, &actual);
        assert_eq!(result.substitutions, 1);
        assert_eq!(result.deletions, 1);
        assert_eq!(result.insertions, 0);
        assert_eq!(result.total_errors, 2);
        assert!((result.accuracy - 60.0).abs() < 1e-9);
    }

    #[test]
    fn phoneme_accuracy_of_empty_reference_is_zero() {
        let empty: [&str; 0] = [];
        let result = phoneme_accuracy(&empty, &["AH"]);
        assert_eq!(result.accuracy, 0.0);
        assert_eq!(result.total_expected, 0);
    }

    proptest! {
        #[test]
        fn distance_to_self_is_zero(a in "[a-z]{0,12}") {
            prop_assert_eq!(str_edit_distance(&a, &a), 0);
        }

        #[test]
        fn distance_is_symmetric(a in "[a-z]{0,10}", b in "[a-z]{0,10}") {
            prop_assert_eq!(str_edit_distance(&a, &b), str_edit_distance(&b, &a));
        }

        #[test]
        fn normalized_distance_is_bounded(a in "[a-zé]{0,10}", b in "[a-zé]{0,10}") {
            let d = str_normalized_distance(&a, &b);
            prop_assert!((0.0..=1.0).contains(&d));
        }

        #[test]
        fn operation_cost_equals_distance(a in "[abc]{0,8}", b in "[abc]{0,8}") {
            let ops = str_edit_operations(&a, &b);
            let cost = ops.iter().filter(|op| op.kind != EditKind::Match).count();
            prop_assert_eq!(cost, str_edit_distance(&a, &b));
            let consumed = ops.iter().filter(|op| op.kind != EditKind::Insert).count();
            prop_assert_eq!(consumed, a.chars().count());
        }
    }
}
