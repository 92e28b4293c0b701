// tests/buffer_properties.rs
//! Property checks for buffer window invariants.

use proptest::prelude::*;
use secnet::buffer::{BufferRange, read_prefixed, write_prefixed};
use secnet::Buffer;

#[derive(Debug, Clone)]
enum Op {
    Append(Vec<u8>),
    Write(Vec<u8>, usize),
    Consume(usize),
    Reset(usize),
    Pad(usize, usize, u8),
    Increase(usize, bool),
    MarkUsed(usize),
    MarkUnused(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..300).prop_map(Op::Append),
        (prop::collection::vec(any::<u8>(), 0..64), 0usize..600).prop_map(|(b, at)| Op::Write(b, at)),
        (0usize..400).prop_map(Op::Consume),
        (0usize..400).prop_map(Op::Reset),
        (0usize..600, 0usize..200, any::<u8>()).prop_map(|(a, s, v)| Op::Pad(a, s, v)),
        (0usize..3000, any::<bool>()).prop_map(|(c, by)| Op::Increase(c, by)),
        (0usize..300).prop_map(Op::MarkUsed),
        (0usize..300).prop_map(Op::MarkUnused),
    ]
}

fn apply(buf: &mut Buffer, op: &Op) {
    match op {
        Op::Append(bytes) => {
            buf.append(bytes).unwrap();
        }
        Op::Write(bytes, at) => buf.write(bytes, *at).unwrap(),
        Op::Consume(n) => {
            buf.consume(*n);
        }
        Op::Reset(n) => {
            buf.reset(*n);
        }
        Op::Pad(at, size, value) => buf.pad(*at, *size, *value).unwrap(),
        Op::Increase(cap, by) => {
            buf.increase(*cap, *by).unwrap();
        }
        Op::MarkUsed(n) => {
            buf.mark_used(*n);
        }
        Op::MarkUnused(n) => {
            buf.mark_unused(*n);
        }
    }
}

proptest! {
    #[test]
    fn prop_window_fits_capacity_and_capacity_never_shrinks(
        initial in 0usize..128,
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let mut buf = Buffer::new(initial);
        let mut capacity = buf.capacity();
        for op in &ops {
            apply(&mut buf, op);
            prop_assert!(buf.offset() + buf.len() <= buf.capacity());
            prop_assert!(buf.capacity() >= capacity);
            capacity = buf.capacity();
        }
    }

    #[test]
    fn prop_append_preserves_prefix(
        first in prop::collection::vec(any::<u8>(), 0..700),
        second in prop::collection::vec(any::<u8>(), 0..700),
    ) {
        let mut buf = Buffer::new(16);
        buf.append(&first).unwrap();
        let old_len = buf.len();
        let range = buf.append(&second).unwrap();
        prop_assert_eq!(range.offset(), old_len);
        prop_assert_eq!(range.as_slice(), &second[..]);
        prop_assert_eq!(&buf.as_slice()[..old_len], &first[..]);
        prop_assert_eq!(buf.len(), first.len() + second.len());
    }

    #[test]
    fn prop_consume_then_reset_restores_window(
        data in prop::collection::vec(any::<u8>(), 0..500),
        n in 0usize..600,
    ) {
        let mut buf = Buffer::from_slice(&data);
        let before = buf.clone();
        let consumed = buf.consume(n);
        prop_assert_eq!(consumed, n.min(data.len()));
        prop_assert!(buf.reset(consumed));
        prop_assert_eq!(buf, before);
    }

    #[test]
    fn prop_equality_ignores_history(
        data in prop::collection::vec(any::<u8>(), 0..300),
        junk in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let mut a = Buffer::new(4);
        a.append(&junk).unwrap();
        a.append(&data).unwrap();
        a.consume(junk.len());
        a.increase(5000, false).unwrap();

        let b = Buffer::from_slice(&data);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_prefixed_sequence_decodes_in_order(
        items in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..100), 0..10),
        cut in 0usize..64,
    ) {
        let mut wire = Buffer::default();
        for item in &items {
            write_prefixed(&mut wire, item).unwrap();
        }

        let mut input = BufferRange::full(&wire);
        for item in &items {
            prop_assert_eq!(read_prefixed(&mut input).unwrap(), &item[..]);
        }
        prop_assert!(input.is_empty());

        // A truncated tail never advances the range.
        let truncated_len = wire.len().saturating_sub(cut.max(1));
        let mut short = wire.range(0, truncated_len);
        loop {
            let before = short.offset();
            match read_prefixed(&mut short) {
                Ok(_) => prop_assert!(short.offset() > before),
                Err(_) => {
                    prop_assert_eq!(short.offset(), before);
                    break;
                }
            }
        }
    }
}
