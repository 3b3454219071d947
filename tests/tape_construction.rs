//! Building tapes by hand and by recording closures.

use adtape::{record, record_multi, AdError, OpCode, Tape, Traced, VarId};

#[test]
fn builder_and_recorder_produce_same_structure() {
    let mut built = Tape::new();
    let x1 = built.new_input(2.0_f64);
    let x2 = built.new_input(5.0);
    let v2 = built.ln(x1).unwrap();
    let v3 = built.mul(x1, x2).unwrap();
    let v4 = built.add(v2, v3).unwrap();
    let v5 = built.sin(x2).unwrap();
    let v6 = built.sub(v4, v5).unwrap();
    built.set_output(v6).unwrap();

    let (recorded, value) = record(|v| v[0].ln() + v[0] * v[1] - v[1].sin(), &[2.0, 5.0]).unwrap();

    assert_eq!(recorded.len(), built.len());
    for (a, b) in recorded.iter().zip(built.iter()) {
        assert_eq!(a, b);
    }
    assert_eq!(recorded.output_values(), vec![value]);
    assert_eq!(built.value(v6), Some(value));
}

#[test]
fn operands_must_precede_new_variable() {
    let mut t = Tape::new();
    let x = t.new_input(1.0_f64);

    // Not yet created.
    assert_eq!(
        t.push_op(OpCode::Mul, &[x, VarId::from_raw(1)]).unwrap_err(),
        AdError::InvalidOperand {
            operand: 1,
            index: 1
        }
    );
    // Far past the end.
    assert!(matches!(
        t.sin(VarId::from_raw(99)),
        Err(AdError::InvalidOperand { operand: 99, .. })
    ));
    assert_eq!(t.len(), 1);
}

#[test]
fn arity_is_enforced() {
    let mut t = Tape::new();
    let x = t.new_input(1.0_f64);
    assert_eq!(
        t.push_op(OpCode::Add, &[x]).unwrap_err(),
        AdError::Arity {
            op: OpCode::Add,
            expected: 2,
            actual: 1
        }
    );
    assert!(matches!(
        t.push_op(OpCode::Const, &[]),
        Err(AdError::LeafOp { op: OpCode::Const })
    ));
}

#[test]
fn outputs_must_exist() {
    let mut t = Tape::new();
    let x = t.new_input(1.0_f64);
    assert!(t.set_output(x).is_ok());
    assert!(matches!(
        t.set_outputs(&[x, VarId::from_raw(1)]),
        Err(AdError::InvalidOperand { operand: 1, index: 1 })
    ));
    // Failed call keeps the previous outputs.
    assert_eq!(t.outputs().collect::<Vec<_>>(), vec![x]);
}

#[test]
fn domain_error_while_recording_aborts_build() {
    let err = record(|v| v[0].ln() * v[1], &[0.0_f64, 1.0]).unwrap_err();
    assert!(matches!(err, AdError::Domain { op: OpCode::Ln, .. }));

    let err = record(|v| v[0] / (v[1] - v[1]), &[1.0_f64, 1.0]).unwrap_err();
    assert!(matches!(err, AdError::Domain { op: OpCode::Div, .. }));
}

#[test]
fn first_recording_error_wins() {
    let err = record(|v| (-v[0]).ln() + (v[0] / 0.0) + v[0].recip(), &[0.0_f64]).unwrap_err();
    // neg(0) = -0, and ln(-0) fails before the division is reached.
    assert!(matches!(err, AdError::Domain { op: OpCode::Ln, .. }));
}

#[test]
fn recording_uses_fresh_tape_after_error() {
    assert!(record(|v| v[0].ln(), &[-1.0_f64]).is_err());
    let (tape, val) = record(|v| v[0].ln(), &[1.0_f64]).unwrap();
    assert_eq!(val, 0.0);
    assert_eq!(tape.gradient(&[4.0]).unwrap(), vec![0.25]);
}

#[test]
fn scalar_operands_become_constants() {
    let (tape, val) = record(|v| 2.0 * v[0] + v[0] / 4.0 - 1.0, &[8.0_f64]).unwrap();
    assert_eq!(val, 17.0);
    assert_eq!(tape.num_inputs(), 1);
    assert_eq!(tape.iter().filter(|n| n.op == OpCode::Const).count(), 3);
    assert_eq!(tape.gradient(&[8.0]).unwrap(), vec![2.25]);
    // Constants keep their value when inputs change.
    assert_eq!(tape.primals(&[0.0]).unwrap().last().copied(), Some(-1.0));
}

#[test]
fn constant_output_is_placed_on_tape() {
    let (tape, vals) = record_multi(|v| vec![v[0] * v[0], Traced::constant(3.0)], &[2.0_f64]).unwrap();
    assert_eq!(vals, vec![4.0, 3.0]);
    assert_eq!(tape.num_outputs(), 2);
    let jac = tape.jacobian(&[5.0]).unwrap();
    assert_eq!(jac.column(0), vec![10.0, 0.0]);
}

#[test]
fn assign_operators_record() {
    let (tape, val) = record(
        |v| {
            let mut acc = v[0];
            acc += v[1];
            acc *= v[0];
            acc -= v[1];
            acc /= v[1];
            acc
        },
        &[2.0_f64, 4.0],
    )
    .unwrap();
    // ((x + y) * x - y) / y
    assert_eq!(val, 2.0);
    let g = tape.gradient(&[2.0, 4.0]).unwrap();
    // f = x²/y + x - 1: d/dx = 2x/y + 1, d/dy = -x²/y²
    assert_eq!(g, vec![2.0, -0.25]);
}

#[test]
fn traced_handles_expose_tape_ids() {
    let (tape, _) = record(
        |v| {
            assert_eq!(v[0].id(), Some(VarId::from_raw(0)));
            assert_eq!(Traced::<f64>::constant(1.0).id(), None);
            v[0].exp()
        },
        &[0.0_f64],
    )
    .unwrap();
    assert_eq!(tape.outputs().next(), Some(VarId::from_raw(1)));
}

#[test]
fn f32_tapes_record_and_differentiate() {
    let (tape, val) = record(|v| v[0] * v[1] + v[0].sin(), &[1.0_f32, 2.0]).unwrap();
    assert!((val - (2.0 + 1.0_f32.sin())).abs() < 1e-6);
    let g = tape.gradient(&[1.0, 2.0]).unwrap();
    assert!((g[0] - (2.0 + 1.0_f32.cos())).abs() < 1e-6);
    assert!((g[1] - 1.0).abs() < 1e-6);
}

#[test]
#[should_panic(expected = "No active tape")]
fn arithmetic_outside_recording_panics() {
    let mut t = Tape::new();
    let x = t.new_input(1.0_f64);
    let a = Traced::from_tape(&t, x).unwrap();
    let _ = a + a;
}

#[test]
fn from_tape_reads_recorded_primal() {
    let mut t = Tape::new();
    let x = t.new_input(2.5_f64);
    let a = Traced::from_tape(&t, x).unwrap();
    assert_eq!(a.value(), 2.5);
    assert_eq!(a.id(), Some(x));
    assert!(Traced::from_tape(&t, VarId::from_raw(1)).is_none());
}

#[test]
fn handle_from_enclosing_recording_is_rejected() {
    let mut nested = None;
    let (outer, val) = record(
        |x| {
            nested = Some(record(|y| y[0] * x[0], &[10.0_f64]));
            x[0]
        },
        &[3.0],
    )
    .unwrap();

    // x[0] has index 0 on the outer tape; the inner tape must not read it
    // as its own input 0.
    assert_eq!(
        nested.unwrap().unwrap_err(),
        AdError::InvalidOperand {
            operand: 0,
            index: 1
        }
    );
    // The outer recording is unaffected.
    assert_eq!(val, 3.0);
    assert_eq!(outer.gradient(&[3.0]).unwrap(), vec![1.0]);
}

#[test]
fn handle_leaking_out_of_recording_is_rejected() {
    let mut leaked = None;
    record(
        |x| {
            leaked = Some(x[0]);
            x[0].sin()
        },
        &[1.0_f64],
    )
    .unwrap();
    let leaked = leaked.unwrap();

    // Returned directly as an output.
    assert!(matches!(
        record(|_| leaked, &[5.0_f64]),
        Err(AdError::InvalidOperand { operand: 0, .. })
    ));
    // Used in a unary op; later ops on the poisoned result do not mask it.
    assert!(matches!(
        record(|y| leaked.exp() + y[0], &[5.0_f64]),
        Err(AdError::InvalidOperand { operand: 0, .. })
    ));
}
