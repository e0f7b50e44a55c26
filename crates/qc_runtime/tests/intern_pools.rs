use proptest::prelude::*;
use qc_core::{Number, Text};
use qc_runtime::{ConstTable, InternPool, LiteralTable};

proptest! {
    #[test]
    fn top_slot_is_live_after_any_release_order(
        count in 1usize..24,
        order in proptest::collection::vec(any::<prop::sample::Index>(), 0..24),
    ) {
        let mut pool: InternPool<Text> = InternPool::new("test", 4);
        let mut held: Vec<usize> = (0..count).map(|i| pool.intern(Text::from(format!("s{i}").as_str()))).collect();
        for pick in order {
            if held.is_empty() {
                break;
            }
            let index = held.remove(pick.index(held.len()));
            pool.release(index);
            prop_assert!(pool.is_empty() || pool.is_live(pool.len() - 1));
        }
        prop_assert_eq!(pool.live(), held.len());
    }
}

proptest! {
    #[test]
    fn interning_is_idempotent_and_distinct(words in proptest::collection::vec("[a-c]{0,3}", 1..16)) {
        let mut table = LiteralTable::new(8);
        let indices: Vec<usize> = words.iter().map(|w| table.add_string(w.as_bytes())).collect();
        for (i, a) in words.iter().enumerate() {
            for (j, b) in words.iter().enumerate() {
                prop_assert_eq!(indices[i] == indices[j], a == b);
            }
            let found = table.find(indices[i]);
            prop_assert_eq!(found.as_bytes(), a.as_bytes());
        }
    }
}

#[test]
fn tombstone_is_reused_before_growing() {
    let mut pool: InternPool<Text> = InternPool::new("test", 2);
    let a = pool.intern(Text::from("a"));
    let b = pool.intern(Text::from("b"));
    let c = pool.intern(Text::from("c"));
    pool.release(b);
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.intern(Text::from("d")), b);
    pool.release(c);
    assert_eq!(pool.len(), 2);
    assert_eq!(pool.links(a), 1);
}

#[test]
fn equal_numbers_share_a_constant() {
    let mut consts = ConstTable::new(16);
    let half = consts.add_number("1/2").unwrap();
    let again = consts.add_number("0.5").unwrap();
    assert_eq!(half, again);
    assert_eq!(consts.links(half), 2);
    assert_eq!(consts.add(Number::from_i64(10)), consts.add_number("10").unwrap());
    consts.free(half);
    consts.free(half);
    assert_eq!(consts.live(), 8);
}

#[test]
#[should_panic(expected = "already freed")]
fn freed_literal_index_is_fatal() {
    let mut table = LiteralTable::new(4);
    let i = table.add_string(b"gone");
    let _j = table.add_string(b"kept");
    table.free(i);
    let _ = table.find(i);
}
