//! Recipient chunking.

/// Split `recipients` into ordered chunks of at most `max_per_call`
/// entries. Concatenating the chunks reproduces the input exactly; empty
/// input yields zero chunks.
pub fn chunk<T: Clone>(recipients: &[T], max_per_call: usize) -> Vec<Vec<T>> {
    assert!(max_per_call > 0, "max_per_call must be at least 1");
    recipients
        .chunks(max_per_call)
        .map(<[T]>::to_vec)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk::<String>(&[], 1000).is_empty());
    }

    #[test]
    fn test_chunks_preserve_order_and_bound() {
        let recipients: Vec<u32> = (0..2500).collect();
        let chunks = chunk(&recipients, 1000);

        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![1000, 1000, 500]
        );
        let concatenated: Vec<u32> = chunks.into_iter().flatten().collect();
        assert_eq!(concatenated, recipients);
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk(&[1, 2, 3, 4], 2);
        assert_eq!(chunks, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_single_oversized_bound() {
        let chunks = chunk(&[1, 2, 3], 10);
        assert_eq!(chunks, vec![vec![1, 2, 3]]);
    }
}
