//! `$` intrinsic functions and special variables for the M interpreter.
//!
//! `$Order` and `$Select` need the interpreter (a variable reference and lazy
//! evaluation respectively); the rest are pure functions of their evaluated
//! arguments.

use crate::parser::ast::{BuiltinFunction, Expr, ExprKind, SpecialVariable, BUILTINS};

use super::error::RuntimeError;
use super::value::MValue;
use super::Interpreter;

impl Interpreter {
    pub(crate) fn eval_builtin(
        &mut self,
        function: BuiltinFunction,
        args: &[Expr],
    ) -> Result<MValue, RuntimeError> {
        match function {
            BuiltinFunction::Order => self.builtin_order(args),
            BuiltinFunction::Select => self.builtin_select(args),
            _ => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval_value(arg)?);
                }
                call_pure(function, &values)
            }
        }
    }

    pub(crate) fn special_variable(&self, variable: SpecialVariable) -> MValue {
        match variable {
            SpecialVariable::Test => MValue::from_bool(self.test),
        }
    }

    /// `$Order(var(subs...)[,direction])`: the neighbouring key at the last
    /// subscript level, or `""` past either end
    fn builtin_order(&mut self, args: &[Expr]) -> Result<MValue, RuntimeError> {
        let variable = match args.first().map(|arg| &arg.kind) {
            Some(ExprKind::Variable { variable }) => variable,
            _ => {
                return Err(RuntimeError::invalid_argument(
                    "order",
                    "expected a subscripted variable",
                ))
            }
        };
        let Some((last, parents)) = variable.subscripts.split_last() else {
            return Err(RuntimeError::invalid_argument(
                "order",
                "expected a subscripted variable",
            ));
        };

        let mut path = Vec::with_capacity(parents.len());
        for subscript in parents {
            path.push(self.eval_value(subscript)?.to_string());
        }
        let key = self.eval_value(last)?.to_string();
        let backwards = match args.get(1) {
            Some(direction) => self.eval_value(direction)?.to_number() < 0.0,
            None => false,
        };

        let neighbour = self
            .variable_root(&variable.name, variable.global)
            .and_then(|root| root.lookup(&path))
            .map(|node| {
                if backwards {
                    node.get_previous_key(&key)
                } else {
                    node.get_next_key(&key)
                }
            })
            .unwrap_or_default();
        Ok(MValue::Str(neighbour))
    }

    /// `$Select(c1:v1,c2:v2,...)`, with the pairs flattened by the parser
    fn builtin_select(&mut self, args: &[Expr]) -> Result<MValue, RuntimeError> {
        for pair in args.chunks(2) {
            let [condition, value] = pair else {
                return Err(RuntimeError::invalid_argument(
                    "select",
                    "expected condition:value pairs",
                ));
            };
            if self.eval_value(condition)?.is_truthy() {
                return self.eval_value(value);
            }
        }
        Err(RuntimeError::select_exhausted())
    }
}

fn call_pure(function: BuiltinFunction, args: &[MValue]) -> Result<MValue, RuntimeError> {
    match function {
        BuiltinFunction::Ascii => {
            let s = required(args, 0, "ascii")?.to_string();
            let position = optional_integer(args, 1).unwrap_or(1);
            Ok(MValue::Num(ascii(&s, position)))
        }
        BuiltinFunction::Char => Ok(MValue::Str(
            args.iter()
                .filter_map(|code| {
                    let code = code.to_number();
                    (code >= 0.0)
                        .then(|| char::from_u32(code as u32))
                        .flatten()
                })
                .collect(),
        )),
        BuiltinFunction::Extract => {
            let s = required(args, 0, "extract")?.to_string();
            let start = optional_integer(args, 1).unwrap_or(1);
            let end = optional_integer(args, 2).unwrap_or(start);
            Ok(MValue::Str(extract(&s, start, end)))
        }
        BuiltinFunction::Find => {
            let s = required(args, 0, "find")?.to_string();
            let needle = required(args, 1, "find")?.to_string();
            let start = optional_integer(args, 2).unwrap_or(1);
            Ok(MValue::Num(find(&s, &needle, start) as f64))
        }
        BuiltinFunction::Length => {
            let s = required(args, 0, "length")?.to_string();
            let length = match args.get(1) {
                Some(delimiter) => piece_count(&s, &delimiter.to_string()),
                None => s.chars().count(),
            };
            Ok(MValue::Num(length as f64))
        }
        BuiltinFunction::Piece => {
            let s = required(args, 0, "piece")?.to_string();
            let delimiter = required(args, 1, "piece")?.to_string();
            let from = optional_integer(args, 2).unwrap_or(1);
            let to = optional_integer(args, 3).unwrap_or(from);
            Ok(MValue::Str(piece(&s, &delimiter, from, to)))
        }
        BuiltinFunction::Order | BuiltinFunction::Select => Err(RuntimeError::invalid_argument(
            builtin_name(function),
            "cannot be applied to evaluated arguments",
        )),
    }
}

fn builtin_name(function: BuiltinFunction) -> &'static str {
    BUILTINS
        .iter()
        .find(|(_, f)| *f == function)
        .map_or("?", |(name, _)| *name)
}

fn required<'v>(args: &'v [MValue], index: usize, name: &str) -> Result<&'v MValue, RuntimeError> {
    args.get(index).ok_or_else(|| {
        RuntimeError::invalid_argument(name, &format!("missing argument {}", index + 1))
    })
}

fn optional_integer(args: &[MValue], index: usize) -> Option<i64> {
    args.get(index).map(to_integer)
}

/// Integer part of a value, as character positions are counted
pub fn to_integer(value: &MValue) -> i64 {
    value.to_number().trunc() as i64
}

/// Characters `start..=end` (1-based), clamped to the string
pub fn extract(s: &str, start: i64, end: i64) -> String {
    let start = start.max(1);
    let end = end.min(s.chars().count() as i64);
    if end < start {
        return String::new();
    }
    s.chars()
        .skip((start - 1) as usize)
        .take((end - start + 1) as usize)
        .collect()
}

/// Longest string a `$E` assignment may pad out to, in characters
pub const MAX_STRING_LENGTH: usize = 1 << 20;

/// Replace characters `start..=end` (1-based) with `replacement`, padding with
/// spaces when `start` lies past the end of the string
pub fn replace_extract(
    s: &str,
    start: i64,
    end: i64,
    replacement: &str,
) -> Result<String, RuntimeError> {
    let start = start.max(1);
    if end < start {
        return Ok(s.to_string());
    }
    if start - 1 > MAX_STRING_LENGTH as i64 {
        return Err(RuntimeError::invalid_argument(
            "extract",
            &format!("position {} is past the {} character limit", start, MAX_STRING_LENGTH),
        ));
    }
    let start = start as usize;

    let mut chars: Vec<char> = s.chars().collect();
    if chars.len() < start - 1 {
        chars.resize(start - 1, ' ');
    }
    let end = usize::try_from(end).unwrap_or(usize::MAX).min(chars.len());

    let mut result: String = chars[..start - 1].iter().collect();
    result.push_str(replacement);
    result.extend(&chars[end..]);
    Ok(result)
}

/// Position just after the first match of `needle` at or after `start`, or 0
pub fn find(s: &str, needle: &str, start: i64) -> usize {
    let start = start.max(1) as usize;
    let offset = match s.char_indices().nth(start - 1) {
        Some((offset, _)) => offset,
        None if s.chars().count() == start - 1 => s.len(),
        None => return 0,
    };
    if needle.is_empty() {
        return start;
    }
    match s[offset..].find(needle) {
        Some(found) => s[..offset + found].chars().count() + needle.chars().count() + 1,
        None => 0,
    }
}

/// Number of `delimiter`-separated pieces; 0 for an empty delimiter
pub fn piece_count(s: &str, delimiter: &str) -> usize {
    if delimiter.is_empty() {
        return 0;
    }
    s.matches(delimiter).count() + 1
}

/// Pieces `from..=to` (1-based) rejoined with `delimiter`
pub fn piece(s: &str, delimiter: &str, from: i64, to: i64) -> String {
    if delimiter.is_empty() {
        return String::new();
    }
    let pieces: Vec<&str> = s.split(delimiter).collect();
    let from = from.max(1);
    let to = to.min(pieces.len() as i64);
    if to < from {
        return String::new();
    }
    pieces[(from - 1) as usize..to as usize].join(delimiter)
}

/// Code of the character at `position` (1-based), or -1
pub fn ascii(s: &str, position: i64) -> f64 {
    if position < 1 {
        return -1.0;
    }
    s.chars()
        .nth((position - 1) as usize)
        .map_or(-1.0, |c| f64::from(u32::from(c)))
}

#[cfg(test)]
mod builtins_tests {
    use super::*;

    #[test]
    fn test_extract() {
        assert_eq!(extract("hello", 2, 4), "ell");
        assert_eq!(extract("hello", 2, 2), "e");
        assert_eq!(extract("hello", 0, 2), "he");
        assert_eq!(extract("hello", 4, 99), "lo");
        assert_eq!(extract("hello", 9, 12), "");
        assert_eq!(extract("hello", 3, 1), "");
    }

    #[test]
    fn test_replace_extract() {
        let replace = |s, start, end, with| replace_extract(s, start, end, with).unwrap();
        assert_eq!(replace("hello", 2, 3, "EE"), "hEElo");
        assert_eq!(replace("hello", 1, 1, ""), "ello");
        assert_eq!(replace("ab", 5, 5, "x"), "ab  x");
        assert_eq!(replace("hello", 4, 2, "zz"), "hello");
        assert_eq!(replace("", 1, 1, "new"), "new");
        assert_eq!(replace("hello", 2, 99_999_999_999, "i"), "hi");
    }

    #[test]
    fn test_replace_extract_rejects_padding_past_limit() {
        let err = replace_extract("ab", 99_999_999_999, 99_999_999_999, "z").unwrap_err();
        assert_eq!(err.code, "E4005");

        let at_limit = MAX_STRING_LENGTH as i64 + 1;
        let padded = replace_extract("", at_limit, at_limit, "z").unwrap();
        assert_eq!(padded.chars().count(), MAX_STRING_LENGTH + 1);
        assert!(replace_extract("", at_limit + 1, at_limit + 1, "z").is_err());
    }

    #[test]
    fn test_find() {
        assert_eq!(find("hello", "l", 1), 4);
        assert_eq!(find("hello", "l", 4), 5);
        assert_eq!(find("hello", "z", 1), 0);
        assert_eq!(find("hello", "", 3), 3);
        assert_eq!(find("hello", "o", 99), 0);
        assert_eq!(find("", "", 1), 1);
    }

    #[test]
    fn test_pieces() {
        assert_eq!(piece("a,b,c", ",", 2, 2), "b");
        assert_eq!(piece("a,b,c", ",", 2, 3), "b,c");
        assert_eq!(piece("a,b,c", ",", 5, 5), "");
        assert_eq!(piece("a,b,c", "", 1, 1), "");
        assert_eq!(piece_count("a,b,c", ","), 3);
        assert_eq!(piece_count("abc", ","), 1);
        assert_eq!(piece_count("abc", ""), 0);
    }

    #[test]
    fn test_ascii_and_char() {
        assert_eq!(ascii("A", 1), 65.0);
        assert_eq!(ascii("AB", 2), 66.0);
        assert_eq!(ascii("A", 2), -1.0);
        assert_eq!(ascii("", 1), -1.0);
        let chars = call_pure(
            BuiltinFunction::Char,
            &[MValue::Num(72.0), MValue::Num(-1.0), MValue::Num(105.0)],
        );
        assert_eq!(chars, Ok(MValue::from("Hi")));
    }

    #[test]
    fn test_missing_argument() {
        let err = call_pure(BuiltinFunction::Piece, &[MValue::from("a")]).unwrap_err();
        assert_eq!(err.code, "E4005");
    }
}
