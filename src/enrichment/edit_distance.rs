/// Levenshtein distance between `a` and `b`, counted over `char`s with unit
/// cost for insertion, deletion and substitution. Case-sensitive.
pub fn distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::distance;

    #[test]
    fn test_distance_kitten_sitting() {
        assert_eq!(distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_distance_identity_is_zero() {
        for value in ["", "a", "Night Drive (Original Mix)", "Ünïcödé"] {
            assert_eq!(distance(value, value), 0);
        }
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            ("kitten", "sitting"),
            ("", "abc"),
            ("Night Drive", "Night Drive (Original Mix)"),
            ("flaw", "lawn"),
        ];
        for (a, b) in pairs {
            assert_eq!(distance(a, b), distance(b, a), "{a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_distance_against_empty_is_length_in_chars() {
        assert_eq!(distance("", "héllo"), 5);
        assert_eq!(distance("héllo", ""), 5);
    }

    #[test]
    fn test_distance_is_case_sensitive() {
        assert_eq!(distance("Mix", "mix"), 1);
    }
}
