use super::*;
use pretty_assertions::assert_eq;

fn parse_ok(source: &str) -> Program {
    match parse_source(source) {
        Ok(program) => program,
        Err(bag) => panic!("Parse error: {:?}", bag.diagnostics()),
    }
}

fn parse_err(source: &str) -> crate::diagnostics::Diagnostic {
    let bag = parse_source(source).expect_err("expected a parse error");
    assert_eq!(bag.len(), 1, "parsing stops at the first error");
    bag.diagnostics()[0].clone()
}

fn write_exprs(command: &Command) -> Vec<&Expr> {
    let CommandBody::Write { args } = &command.body else {
        panic!("expected write, got {:?}", command.body);
    };
    args.iter()
        .filter_map(|arg| match arg {
            WriteArg::Expr { expr } => Some(expr),
            _ => None,
        })
        .collect()
}

#[test]
fn test_parse_bare_block_without_tags() {
    let program = parse_ok(" w 3+4-3");
    assert!(program.tags.is_empty());
    assert_eq!(program.commands.len(), 1);
    assert!(matches!(program.commands[0].body, CommandBody::Write { .. }));
}

#[test]
fn test_tags_register_index_and_params() {
    let program = parse_ok("main w 1\n q\nsub(a,b) q a+b\n");
    assert_eq!(program.commands.len(), 3);
    assert_eq!(
        program.tag("main"),
        Some(&Tag {
            index: 0,
            params: None
        })
    );
    assert_eq!(
        program.tag("sub"),
        Some(&Tag {
            index: 2,
            params: Some(vec!["a".to_string(), "b".to_string()])
        })
    );
    let order: Vec<_> = program.tags_in_order().into_iter().map(|(n, _)| n).collect();
    assert_eq!(order, vec!["main", "sub"]);
}

#[test]
fn test_duplicate_tag_keeps_first_definition() {
    let program = parse_ok("a w 1\na w 2\n");
    assert_eq!(program.commands.len(), 2);
    assert_eq!(program.tag("a").map(|t| t.index), Some(0));
}

#[test]
fn test_bare_tag_line_followed_by_block() {
    let program = parse_ok("main\n s x=1\n w x\n");
    assert_eq!(program.tag("main").map(|t| t.index), Some(0));
    assert_eq!(program.commands.len(), 2);
}

#[test]
fn test_command_names_are_prefix_matched() {
    for name in ["w", "wr", "WRI", "Write"] {
        let program = parse_ok(&format!(" {} 1", name));
        assert!(
            matches!(program.commands[0].body, CommandBody::Write { .. }),
            "{} should resolve to write",
            name
        );
    }
    let program = parse_ok(" h");
    assert!(matches!(program.commands[0].body, CommandBody::Halt));
}

#[test]
fn test_binary_operators_associate_left_without_precedence() {
    let program = parse_ok(" w 3+4*3");
    let exprs = write_exprs(&program.commands[0]);
    let ExprKind::BinaryOp { op, left, .. } = &exprs[0].kind else {
        panic!("expected binary op");
    };
    assert_eq!(*op, BinaryOp::Multiply);
    assert!(matches!(
        left.kind,
        ExprKind::BinaryOp {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn test_negated_operator() {
    let program = parse_ok(" w 1'=2");
    let exprs = write_exprs(&program.commands[0]);
    assert!(matches!(
        exprs[0].kind,
        ExprKind::BinaryOp {
            op: BinaryOp::Equals,
            negated: true,
            ..
        }
    ));
}

#[test]
fn test_arithmetic_operator_cannot_be_negated() {
    let err = parse_err(" w 1'+2");
    assert_eq!(err.code, "E1001");
    assert_eq!(err.column, 5);
}

#[test]
fn test_unary_operators_nest() {
    let program = parse_ok(" w -'1");
    let exprs = write_exprs(&program.commands[0]);
    let ExprKind::UnaryOp { op, operand } = &exprs[0].kind else {
        panic!("expected unary op");
    };
    assert_eq!(*op, UnaryOp::Minus);
    assert!(matches!(
        operand.kind,
        ExprKind::UnaryOp {
            op: UnaryOp::Not,
            ..
        }
    ));
}

#[test]
fn test_write_format_arguments() {
    let program = parse_ok(r#" w !,#,!!,"x""#);
    let CommandBody::Write { args } = &program.commands[0].body else {
        panic!("expected write");
    };
    assert_eq!(args.len(), 5);
    assert!(matches!(args[0], WriteArg::Newline));
    assert!(matches!(args[1], WriteArg::Clear));
    assert!(matches!(args[2], WriteArg::Newline));
    assert!(matches!(args[3], WriteArg::Newline));
    assert!(matches!(args[4], WriteArg::Expr { .. }));
}

#[test]
fn test_string_literal_collapses_doubled_quotes() {
    let program = parse_ok(r#" w "a""b""""#);
    let exprs = write_exprs(&program.commands[0]);
    match &exprs[0].kind {
        ExprKind::StringLiteral { value } => assert_eq!(value, "a\"b\""),
        other => panic!("expected string literal, got {:?}", other),
    }
}

#[test]
fn test_do_block_collects_dotted_lines() {
    let program = parse_ok("main d\n . w 1\n . d\n . . w 2\n w 3\n");
    assert_eq!(program.commands.len(), 2);

    let CommandBody::DoBlock { block } = &program.commands[0].body else {
        panic!("expected do block");
    };
    assert_eq!(block.len(), 2);
    let CommandBody::DoBlock { block: inner } = &block[1].body else {
        panic!("expected nested do block");
    };
    assert_eq!(inner.len(), 1);
    assert_eq!(inner[0].span.start.line, 3);

    assert!(matches!(program.commands[1].body, CommandBody::Write { .. }));
    assert_eq!(program.commands[1].span.start.line, 4);
}

#[test]
fn test_commands_after_do_block_on_same_line() {
    let program = parse_ok(" d  w 2\n . w 1\n");
    assert_eq!(program.commands.len(), 2);
    let CommandBody::DoBlock { block } = &program.commands[0].body else {
        panic!("expected do block");
    };
    assert_eq!(block.len(), 1);
    assert!(matches!(program.commands[1].body, CommandBody::Write { .. }));
}

#[test]
fn test_do_calls_with_reference_arguments() {
    let program = parse_ok(" d sub(.x,1+2),other");
    let CommandBody::Do { calls } = &program.commands[0].body else {
        panic!("expected do");
    };
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].name.name, "sub");
    assert!(matches!(&calls[0].args[0], Argument::Reference { name } if name.name == "x"));
    assert!(matches!(calls[0].args[1], Argument::Value { .. }));
    assert_eq!(calls[1].name.name, "other");
    assert!(calls[1].args.is_empty());
}

#[test]
fn test_if_collects_trailing_commands() {
    let program = parse_ok(" i x=1,y w 1 w 2\n w 3");
    assert_eq!(program.commands.len(), 2);
    let CommandBody::If {
        conditions,
        children,
    } = &program.commands[0].body
    else {
        panic!("expected if");
    };
    assert_eq!(conditions.len(), 2);
    assert_eq!(children.len(), 2);
}

#[test]
fn test_argumentless_if_and_else() {
    let program = parse_ok(" i  w 1\n e  w 2");
    let CommandBody::If {
        conditions,
        children,
    } = &program.commands[0].body
    else {
        panic!("expected if");
    };
    assert!(conditions.is_empty());
    assert_eq!(children.len(), 1);
    assert!(matches!(
        &program.commands[1].body,
        CommandBody::Else { children } if children.len() == 1
    ));
}

#[test]
fn test_for_forms() {
    let program = parse_ok(" f i=1:1:3 w i\n f j=5 w j\n f  q");

    let CommandBody::For { argument, children } = &program.commands[0].body else {
        panic!("expected for");
    };
    let argument = argument.as_ref().expect("for argument");
    assert_eq!(argument.variable.name, "i");
    assert!(argument.increment.is_some());
    assert!(argument.end.is_some());
    assert_eq!(children.len(), 1);

    let CommandBody::For { argument, .. } = &program.commands[1].body else {
        panic!("expected for");
    };
    let argument = argument.as_ref().expect("for argument");
    assert!(argument.increment.is_none());
    assert!(argument.end.is_none());

    assert!(matches!(
        &program.commands[2].body,
        CommandBody::For { argument: None, children } if children.len() == 1
    ));
}

#[test]
fn test_set_targets() {
    let program = parse_ok(r#" s x(1,"a")=2,^g=3,$e(y,2,3)="ab""#);
    let CommandBody::Set { args } = &program.commands[0].body else {
        panic!("expected set");
    };
    assert_eq!(args.len(), 3);

    let SetTarget::Variable { variable } = &args[0].target else {
        panic!("expected variable target");
    };
    assert_eq!(variable.name, "x");
    assert_eq!(variable.subscripts.len(), 2);
    assert!(!variable.global);

    let SetTarget::Variable { variable } = &args[1].target else {
        panic!("expected variable target");
    };
    assert!(variable.global);
    assert!(variable.is_scalar());

    assert!(matches!(
        &args[2].target,
        SetTarget::Extract { variable, start: Some(_), end: Some(_) } if variable.name == "y"
    ));
}

#[test]
fn test_set_rejects_other_builtin_targets() {
    let err = parse_err(" s $l(x)=1");
    assert_eq!(err.code, "E1006");
}

#[test]
fn test_new_kill_merge() {
    let program = parse_ok(" n a,b\n k x(1),y\n k\n m a(1)=b");
    assert!(matches!(
        &program.commands[0].body,
        CommandBody::New { names } if names.len() == 2
    ));
    assert!(matches!(
        &program.commands[1].body,
        CommandBody::Kill { targets } if targets.len() == 2
    ));
    assert!(matches!(
        &program.commands[2].body,
        CommandBody::Kill { targets } if targets.is_empty()
    ));
    let CommandBody::Merge { args } = &program.commands[3].body else {
        panic!("expected merge");
    };
    assert_eq!(args[0].destination.subscripts.len(), 1);
    assert_eq!(args[0].source.name, "b");
}

#[test]
fn test_postcondition() {
    let program = parse_ok(r#" w:x>1 "big""#);
    let command = &program.commands[0];
    assert!(matches!(
        command.postcondition.as_ref().map(|e| &e.kind),
        Some(ExprKind::BinaryOp {
            op: BinaryOp::Greater,
            ..
        })
    ));
}

#[test]
fn test_builtins_and_special_variables() {
    let program = parse_ok(" w $o(a(1),-1),$S(x:1,1:2),$$f(1),$t,$L(s)");
    let exprs = write_exprs(&program.commands[0]);
    assert!(matches!(
        &exprs[0].kind,
        ExprKind::Builtin { function: BuiltinFunction::Order, args } if args.len() == 2
    ));
    assert!(matches!(
        &exprs[1].kind,
        ExprKind::Builtin { function: BuiltinFunction::Select, args } if args.len() == 4
    ));
    assert!(matches!(
        &exprs[2].kind,
        ExprKind::Call { call } if call.name.name == "f" && call.args.len() == 1
    ));
    assert!(matches!(
        exprs[3].kind,
        ExprKind::SpecialVariable {
            variable: SpecialVariable::Test
        }
    ));
    assert!(matches!(
        &exprs[4].kind,
        ExprKind::Builtin { function: BuiltinFunction::Length, .. }
    ));
}

#[test]
fn test_comment_lines_and_commands() {
    let program = parse_ok("; header\nmain ; note\n w 1 ; trailing\n");
    assert_eq!(program.commands.len(), 3);
    assert!(matches!(
        &program.commands[0].body,
        CommandBody::Comment { text } if text == " note"
    ));
    assert!(matches!(program.commands[2].body, CommandBody::Comment { .. }));
}

#[test]
fn test_unknown_command() {
    let err = parse_err(" zz 1");
    assert_eq!(err.code, "E1002");
    assert_eq!(err.line, 0);
    assert_eq!(err.column, 1);
    assert!(err.message.contains("zz"));
}

#[test]
fn test_missing_space_between_commands() {
    let err = parse_err(" w 1w");
    assert_eq!(err.code, "E1005");
    assert_eq!(err.column, 4);
}

#[test]
fn test_unterminated_list() {
    let err = parse_err(" w $l(1");
    assert_eq!(err.code, "E1004");
}

#[test]
fn test_invalid_line_start() {
    let err = parse_err("main\n w 1\n(x");
    assert_eq!(err.code, "E1007");
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 0);
}

#[test]
fn test_unknown_builtin_and_special_variable() {
    assert_eq!(parse_err(" w $zz(1)").code, "E1003");
    assert_eq!(parse_err(" w $zz").code, "E1003");
}

#[test]
fn test_lexical_errors_stop_before_parsing() {
    let bag = parse_source(" w 1%").expect_err("expected lexical error");
    assert_eq!(bag.diagnostics()[0].code, "E0001");
}

#[test]
fn test_parse_direct_line() {
    let commands = parse_direct_line("s x=1 w x").expect("direct line");
    assert_eq!(commands.len(), 2);
    assert!(parse_direct_line("").expect("empty line").is_empty());
}
