use num_bigint::BigInt;
use proptest::prelude::*;
use qc_core::{ByteBlock, Number, Text, Value};

proptest! {
    #[test]
    fn links_minus_unlinks_is_live_count(links in 0usize..32, drops in 0usize..32) {
        let n = Number::from_i64(42);
        let mut owners: Vec<Number> = (0..links).map(|_| n.link()).collect();
        let drops = drops.min(owners.len());
        owners.truncate(owners.len() - drops);
        prop_assert_eq!(n.links(), 1 + links - drops);
    }
}

proptest! {
    #[test]
    fn text_clone_and_drop_conserve_links(s in ".*", extra in 0usize..16) {
        let t = Text::from(s.as_str());
        let held: Vec<Value> = (0..extra).map(|_| Value::text(t.link())).collect();
        prop_assert_eq!(t.links(), 1 + extra);
        drop(held);
        prop_assert!(t.is_unique());
    }
}

proptest! {
    #[test]
    fn numerator_overwrite_reads_back(v in any::<u64>(), dsi in 0usize..4, bytes in proptest::collection::vec(any::<u8>(), 0..12)) {
        let n = Number::from_integer(BigInt::from(v));
        let m = n.with_numerator_bytes(dsi, &bytes);
        let image = m.numerator_bytes();
        let start = dsi * 4;
        // Trailing zero words vanish once the magnitude is normalized.
        let written: Vec<u8> = image.iter().skip(start).take(bytes.len()).copied().collect();
        let expected: Vec<u8> = bytes.iter().take(written.len()).copied().collect();
        prop_assert_eq!(written, expected);
        prop_assert!(m.numerator_len() <= (n.numerator_len()).max(dsi + bytes.len().div_ceil(4)).max(1));
    }
}

proptest! {
    #[test]
    fn block_capacity_is_chunk_multiple(len in 0usize..2048, chunk in 1usize..512) {
        let b = ByteBlock::alloc(len, chunk);
        prop_assert_eq!(b.capacity() % chunk, 0);
        prop_assert!(b.capacity() > len);
        prop_assert!(b.as_slice().iter().all(|&x| x == 0));
    }
}
