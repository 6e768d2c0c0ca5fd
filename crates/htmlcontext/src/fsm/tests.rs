use alloc::{
    format,
    string::{String, ToString},
    sync::Arc,
    vec,
    vec::Vec,
};

use super::*;

const START: State = State::new(0);
const MID: State = State::new(1);
const END: State = State::new(2);

fn digits_machine() -> Machine<()> {
    let mut def = Definition::new(1).unwrap();
    def.populate(&[Rule::new(b"[0-2]", START, START)]).unwrap();
    def.set_names(&["start"]).unwrap();
    Machine::new(Arc::new(def), ())
}

type Log = Vec<String>;

fn on_enter(m: &mut Machine<Log>, step: Step) -> Option<State> {
    m.user_mut().push(format!("enter {} {:?}", step.to.id(), step.byte));
    None
}

fn on_exit(m: &mut Machine<Log>, step: Step) -> Option<State> {
    m.user_mut().push(format!("exit {} {:?}", step.from.id(), step.byte));
    None
}

fn on_in_state(m: &mut Machine<Log>, step: Step) -> Option<State> {
    m.user_mut().push(format!("in {}", step.to.id()));
    None
}

fn redirect_to_end(_: &mut Machine<Log>, step: Step) -> Option<State> {
    (step.to == START).then_some(END)
}

fn logging_machine() -> Machine<Log> {
    let mut def = Definition::new(3).unwrap();
    def.populate(&[
        Rule::new(b"default", START, START),
        Rule::new(b"m", START, MID),
        Rule::new(b"default", MID, MID),
        Rule::new(b"s", MID, START),
        Rule::new(b"default", END, END),
    ])
    .unwrap();
    for state in [START, MID, END] {
        def.set_enter(state, on_enter).unwrap();
        def.set_exit(state, on_exit).unwrap();
        def.set_in_state(state, on_in_state).unwrap();
    }
    Machine::new(Arc::new(def), Vec::new())
}

#[test]
fn default_then_specific_rules() {
    let mut def = Definition::<()>::new(2).unwrap();
    def.populate(&[
        Rule::new(b"default", START, START),
        Rule::new(b"[a-c]", START, MID),
        Rule::new(b"b", START, START),
    ])
    .unwrap();

    assert_eq!(def.next(START, b'a'), MID);
    assert_eq!(def.next(START, b'b'), START);
    assert_eq!(def.next(START, b'c'), MID);
    assert_eq!(def.next(START, b'z'), START);
    // nothing was said about MID
    assert_eq!(def.next(MID, b'a'), State::ERROR);
    assert_eq!(def.next(State::ERROR, b'a'), State::ERROR);
}

#[test]
fn default_after_specific_rule_is_rejected() {
    let mut def = Definition::<()>::new(1).unwrap();
    let err = def
        .populate(&[
            Rule::new(b"x", START, START),
            Rule::new(b"default", START, START),
        ])
        .unwrap_err();
    assert_eq!(err, ConfigError::DefaultNotFirst(0));
}

#[test]
fn configuration_errors() {
    assert_eq!(
        Definition::<()>::new(0).unwrap_err(),
        ConfigError::StateCount(0)
    );
    assert_eq!(
        Definition::<()>::new(State::MAX_STATES + 1).unwrap_err(),
        ConfigError::StateCount(128)
    );
    assert!(Definition::<()>::new(State::MAX_STATES).is_ok());

    let mut def = Definition::<()>::new(2).unwrap();
    assert_eq!(
        def.populate(&[Rule::new(b"a", START, State::new(5))]),
        Err(ConfigError::StateOutOfRange {
            state: 5,
            num_states: 2
        })
    );
    assert!(
        def.populate(&[Rule::new(b"a", START, State::ERROR)])
            .is_ok()
    );
    assert_eq!(
        def.set_names(&["only-one"]),
        Err(ConfigError::NameCount {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn unexpected_byte_halts() {
    let mut m = digits_machine();
    assert_eq!(m.parse(b"012"), Ok(START));

    let err = m.parse(b"9").unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::UnexpectedByte {
            byte: b'9',
            state: Some("start")
        }
    );
    assert_eq!((err.line, err.column), (1, 4));
    assert_eq!(
        err.to_string(),
        "unexpected character '9' in state 'start' at 1:4"
    );
    assert_eq!(m.state(), State::ERROR);
    assert_eq!(m.error(), Some(&err));
}

#[test]
fn error_stops_processing_the_chunk() {
    let mut def = Definition::new(1).unwrap();
    def.populate(&[Rule::new(b"[0-2]", START, START)]).unwrap();
    def.set_in_state(START, |m: &mut Machine<usize>, _| {
        *m.user_mut() += 1;
        None
    })
    .unwrap();
    let mut m = Machine::new(Arc::new(def), 0usize);

    assert!(m.parse(b"01x22").is_err());
    assert_eq!(*m.user(), 2);
    assert_eq!(m.current_byte(), Some(b'x'));
}

#[test]
fn errors_are_sticky_until_reset() {
    let mut m = digits_machine();
    let first = m.parse(b"129").unwrap_err();
    assert_eq!((first.line, first.column), (1, 3));

    assert_eq!(m.parse(b"0"), Err(first.clone()));
    assert_eq!(m.set_state(START), Err(first));

    m.reset();
    assert_eq!(m.error(), None);
    assert_eq!(m.parse(b"2"), Ok(START));
}

#[test]
fn hook_order_per_byte() {
    let mut m = logging_machine();
    m.parse(b"xms").unwrap();
    assert_eq!(
        m.user(),
        &vec![
            "in 0",
            "exit 0 Some(109)",
            "enter 1 Some(109)",
            "in 1",
            "exit 1 Some(115)",
            "enter 0 Some(115)",
            "in 0",
        ]
    );
}

#[test]
fn hook_override_redirects_later_hooks() {
    // An exit hook on MID that sends `s` to END instead of START.
    let mut def = Definition::new(3).unwrap();
    def.populate(&[
        Rule::new(b"default", START, START),
        Rule::new(b"m", START, MID),
        Rule::new(b"default", MID, MID),
        Rule::new(b"s", MID, START),
        Rule::new(b"default", END, END),
    ])
    .unwrap();
    def.set_exit(MID, redirect_to_end).unwrap();
    def.set_enter(START, on_enter).unwrap();
    def.set_enter(END, on_enter).unwrap();
    def.set_in_state(END, on_in_state).unwrap();
    let mut m = Machine::new(Arc::new(def), Vec::new());

    assert_eq!(m.parse(b"ms"), Ok(END));
    assert_eq!(m.user(), &vec!["enter 2 Some(115)", "in 2"]);
}

#[test]
fn set_state_fires_exit_and_enter_only() {
    let mut m = logging_machine();
    assert_eq!(m.set_state(MID), Ok(MID));
    assert_eq!(m.user(), &vec!["exit 0 None", "enter 1 None"]);

    m.user_mut().clear();
    assert_eq!(m.set_state(MID), Ok(MID));
    assert!(m.user().is_empty());
}

#[test]
fn set_state_rejects_unknown_state_without_halting() {
    let mut m = digits_machine();
    let err = m.set_state(State::new(9)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownState(9));
    assert_eq!(m.state(), START);
    assert_eq!(m.parse(b"1"), Ok(START));
}

fn record_enter(m: &mut Machine<()>, _: Step) -> Option<State> {
    m.start_record();
    None
}

fn record_exit(m: &mut Machine<()>, _: Step) -> Option<State> {
    m.stop_record();
    None
}

fn tag_recorder() -> Machine<()> {
    let mut def = Definition::new(2).unwrap();
    def.populate(&[
        Rule::new(b"default", START, START),
        Rule::new(b"<", START, MID),
        Rule::new(b"default", MID, MID),
        Rule::new(b">", MID, START),
    ])
    .unwrap();
    def.set_enter(MID, record_enter).unwrap();
    def.set_exit(MID, record_exit).unwrap();
    Machine::new(Arc::new(def), ())
}

#[test]
fn recording_includes_start_byte_excludes_stop_byte() {
    let mut m = tag_recorder();
    m.parse(b"ab<di").unwrap();
    assert!(m.is_recording());
    assert_eq!(m.record_buffer().as_bytes(), b"<di");

    m.parse(b"v>cd").unwrap();
    assert!(!m.is_recording());
    assert_eq!(m.record_buffer().as_bytes(), b"<div");
    assert_eq!(m.record_buffer().as_bytes_with_nul(), b"<div\0");
}

#[test]
fn recording_truncates_at_capacity() {
    let mut m = tag_recorder();
    let mut input = vec![b'<'];
    input.extend(core::iter::repeat_n(b'x', 2 * RECORD_BUFFER_SIZE));
    m.parse(&input).unwrap();

    let record = m.record_buffer();
    assert_eq!(record.len(), RECORD_BUFFER_SIZE - 1);
    assert_eq!(record.as_bytes()[0], b'<');
    assert_eq!(record.as_bytes_with_nul().last(), Some(&0));
}

#[test]
fn line_and_column_counting() {
    let mut m = tag_recorder();
    m.parse(b"ab\ncd").unwrap();
    assert_eq!((m.line_number(), m.column_number()), (2, 3));
    m.parse(b"\n").unwrap();
    assert_eq!((m.line_number(), m.column_number()), (3, 1));

    m.set_line_number(10);
    m.set_column_number(4);
    m.parse(b"x").unwrap();
    assert_eq!((m.line_number(), m.column_number()), (10, 5));
}

#[test]
fn duplicate_is_independent() {
    let mut original = tag_recorder();
    original.parse(b"<sp").unwrap();

    let mut copy = original.duplicate();
    assert!(Arc::ptr_eq(original.definition(), copy.definition()));
    copy.parse(b"an>").unwrap();

    assert_eq!(copy.state(), START);
    assert_eq!(copy.record_buffer().as_bytes(), b"<span");
    assert_eq!(original.state(), MID);
    assert_eq!(original.record_buffer().as_bytes(), b"<sp");

    let mut target = tag_recorder();
    original.copy_into(&mut target);
    target.parse(b">").unwrap();
    assert_eq!(target.record_buffer().as_bytes(), b"<sp");
    assert_eq!(target.state(), START);
}

#[test]
fn parse_len_validates_length() {
    let mut m = digits_machine();
    assert_eq!(
        m.parse_len(b"01", -1).unwrap_err().kind(),
        &ErrorKind::InvalidLength(-1)
    );
    assert_eq!(
        m.parse_len(b"01", 3).unwrap_err().kind(),
        &ErrorKind::InvalidLength(3)
    );
    assert_eq!(m.error(), None);

    // only the first byte is looked at
    assert_eq!(m.parse_len(b"0x", 1), Ok(START));
    assert_eq!(m.column_number(), 2);
}

#[test]
fn reset_to_unknown_state_halts() {
    let mut m = digits_machine();
    m.reset_to(State::new(3));
    assert_eq!(m.state(), State::ERROR);
    assert_eq!(
        m.parse(b"0").unwrap_err().kind(),
        &ErrorKind::UnknownState(3)
    );
}

#[test]
fn definition_is_shared_across_threads() {
    let mut def = Definition::new(2).unwrap();
    def.populate(&[
        Rule::new(b"default", START, START),
        Rule::new(b"(", START, MID),
        Rule::new(b"default", MID, MID),
        Rule::new(b")", MID, START),
    ])
    .unwrap();
    let def = Arc::new(def);

    let states: Vec<State> = std::thread::scope(|scope| {
        let handles: Vec<_> = ["(a)", "(b", "c", "((d)"]
            .into_iter()
            .map(|input| {
                let def = Arc::clone(&def);
                scope.spawn(move || Machine::new(def, ()).parse(input.as_bytes()).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(states, vec![START, MID, START, START]);
}
