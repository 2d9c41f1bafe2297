//! Handler for the `mlang explain` subcommand.

use crate::diagnostics::error_codes::{lexical, runtime, syntax, ALL};

pub(crate) fn run_explain(code: &str) -> Result<bool, Box<dyn std::error::Error>> {
    match get_error_explanation(code) {
        Some(text) => {
            println!("{}", text);
            Ok(true)
        }
        None => {
            eprintln!("Unknown error code: {}", code);
            eprintln!();
            eprintln!("Valid error codes:");
            eprintln!("  E0xxx  Lexical errors");
            eprintln!("  E1xxx  Syntax errors");
            eprintln!("  E4xxx  Runtime errors");
            eprintln!();
            eprintln!("  {}", ALL.join(" "));
            Ok(false)
        }
    }
}

/// Get a detailed explanation for an error code.
pub(crate) fn get_error_explanation(code: &str) -> Option<&'static str> {
    let code = code.to_ascii_uppercase();
    let explanation = match code.as_str() {
        lexical::UNEXPECTED_CHARACTER => {
            r#"E0001: Unexpected character

The tokenizer found a character that starts no token: not a letter, digit,
operator, quote, `$`, `^`, `.`, `:`, `,`, `(`, `)` or `;`.

Example:
 w 1%2

Fix: Remove the character or use a supported operator (`#` is modulo).
"#
        }
        lexical::UNTERMINATED_STRING => {
            r#"E0002: Unterminated string literal

A string literal was opened with `"` but the line ended before it closed.
Strings never span lines; a quote inside a string is written `""`.

Example:
 w "hello

Fix: Close the string on the same line.
"#
        }
        syntax::UNEXPECTED_TOKEN => {
            r#"E1001: Unexpected token

The parser expected one kind of token (an identifier, `=`, `)`, an
expression) and found another.

Example:
 s =1

Fix: Supply the missing piece of syntax.
"#
        }
        syntax::UNKNOWN_COMMAND => {
            r#"E1002: Unknown command

A command name matched no command, even as an abbreviation. Commands are
matched by prefix: `w`, `wr` and `write` all mean Write.

Example:
 zz 1

Fix: Use one of Write, Quit, Do, If, Else, For, Set, New, Kill, Merge, Halt.
"#
        }
        syntax::UNKNOWN_BUILTIN => {
            r#"E1003: Unknown builtin

A `$name` matched no intrinsic function or special variable.

Example:
 w $zork(1)

Fix: Use $Order, $Length, $Extract, $Select, $Piece, $Find, $Ascii, $Char,
or the special variable $Test.
"#
        }
        syntax::UNTERMINATED_LIST => {
            r#"E1004: Unterminated list

A parenthesized argument, subscript or parameter list reached the end of the
line without its closing `)`.

Example:
 w $l("abc"

Fix: Close the list.
"#
        }
        syntax::MISSING_SPACE => {
            r#"E1005: Missing space

Commands are separated from each other, and from their arguments, by a
single space. An argumentless command is followed by two spaces.

Example:
 w 1w 2

Fix: Insert the space.
"#
        }
        syntax::INVALID_SET_TARGET => {
            r#"E1006: Invalid Set target

Set assigns to a variable or to `$Extract(variable,...)`. Other builtins
cannot be assigned to.

Example:
 s $l(x)=3

Fix: Assign to a variable, or to $Extract of one.
"#
        }
        syntax::INVALID_LINE_START => {
            r#"E1007: Invalid line start

A line must start with a tag name or with whitespace. Inside a Do block
every line carries one `.` per nesting level.

Example:
main d
. w 1

Fix: Indent the line, then add the block dots.
"#
        }
        runtime::TAG_NOT_FOUND => {
            r#"E4001: Tag not found

A Do or `$$` call named neither a tag of the program nor a host extern.

Example:
 d nope

Fix: Define the tag, or check the spelling (tag names are case-sensitive).
"#
        }
        runtime::MERGE_OVERLAP => {
            r#"E4002: Overlapping Merge

Merge copies a whole subtree. Source and target may not be the same node,
and neither may lie inside the other.

Example:
 m a(1,2)=a(1)

Fix: Merge through a temporary variable.
"#
        }
        runtime::SELECT_EXHAUSTED => {
            r#"E4003: $Select found no true condition

Every condition of a $Select evaluated to false.

Example:
 w $s(0:"a")

Fix: End the list with a catch-all `1:value` pair.
"#
        }
        runtime::DIVISION_BY_ZERO => {
            r#"E4004: Division by zero

The right operand of `/` or `#` evaluated to zero.

Example:
 w 1/0

Fix: Guard the operation with a postcondition, e.g. `w:d 1/d`.
"#
        }
        runtime::INVALID_ARGUMENT => {
            r#"E4005: Invalid builtin argument

A builtin received an argument it cannot use: a missing required argument,
or $Order applied to a variable without subscripts.

Example:
 w $o(x)

Fix: Pass the arguments the builtin expects, e.g. `$o(x(""))`.
"#
        }
        runtime::NO_ENTRY_POINT => {
            r#"E4006: No entry point

The tag a host asked to run (the entry or frame tag) does not exist.

Example:
 mlang run game.m --entry start    # but game.m has no `start` tag

Fix: Define the tag, or pass the right --entry.
"#
        }
        runtime::CALL_DEPTH_EXCEEDED => {
            r#"E4007: Call depth exceeded

More than 2000 `do` or `$$` calls were active at once. This is almost
always recursion without a base case.

Example:
main w $$down(5)
 q
down(n) q 1+$$down(n-1)    # never stops at n=0

Fix: Add a base case, e.g. `q:n=0 0`, or turn the recursion into a `for` loop.
"#
        }
        _ => return None,
    };
    Some(explanation)
}
