use libdcpu::{
    op::{fields, pack_basic, pack_special, Fields},
    operand::{fold_literal, unfold_literal, NEXT_WORD, PUSH_POP},
    BasicOp, Op, Register, SpecialOp,
};

#[test]
fn test_literal_folds_into_a() {
    let a = fold_literal(-1).unwrap();
    let word = pack_basic(BasicOp::SET, Register::A.direct(), a).unwrap();
    let Fields { code, b, a } = fields(word);
    assert_eq!(code, BasicOp::SET as u8);
    assert_eq!(b, 0x00);
    assert_eq!(unfold_literal(a), Some(-1));
}

#[test]
fn test_push_pop_share_field() {
    // SET PUSH, POP
    let word = pack_basic(BasicOp::SET, PUSH_POP, PUSH_POP).unwrap();
    assert_eq!(word, 0x6301);
}

#[test]
fn test_special_decodes() {
    for op in [SpecialOp::JSR, SpecialOp::INT, SpecialOp::HWI] {
        let word = pack_special(op, NEXT_WORD).unwrap();
        assert_eq!(fields(word).code, 0);
        assert_eq!(Op::from_word(word), Some(Op::Special(op)));
    }
    // reserved special opcode
    assert_eq!(Op::from_word(0x0040), None);
}
