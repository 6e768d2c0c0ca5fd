use alloc::{sync::Arc, vec::Vec};

use quickcheck::{Gen, QuickCheck};

use crate::fsm::{Definition, Machine, RECORD_BUFFER_SIZE, Rule, State};

fn open_machine() -> Machine<()> {
    let mut def = Definition::new(1).unwrap();
    def.populate(&[Rule::new(b"default", State::new(0), State::new(0))])
        .unwrap();
    Machine::new(Arc::new(def), ())
}

/// Property: whatever is parsed between `start_record` and `stop_record`
/// is captured verbatim, cut at capacity, and always NUL-terminated.
#[test]
fn recording_captures_input_quickcheck() {
    #[allow(clippy::needless_pass_by_value)]
    fn prop(input: Vec<u8>, splits: Vec<usize>) -> bool {
        let mut m = open_machine();
        m.start_record();
        let mut rest = input.as_slice();
        for s in splits {
            if rest.is_empty() {
                break;
            }
            let (head, tail) = rest.split_at(1 + s % rest.len());
            m.parse(head).unwrap();
            rest = tail;
        }
        m.parse(rest).unwrap();
        m.stop_record();
        m.parse(b"ignored").unwrap();

        let kept = input.len().min(RECORD_BUFFER_SIZE - 1);
        let record = m.record_buffer();
        record.as_bytes() == &input[..kept] && record.as_bytes_with_nul()[kept] == 0
    }

    // inputs long enough to hit the capacity
    QuickCheck::new()
        .r#gen(Gen::new(2 * RECORD_BUFFER_SIZE))
        .tests(if is_ci::cached() { 2_000 } else { 500 })
        .quickcheck(prop as fn(Vec<u8>, Vec<usize>) -> bool);
}
