//! Abstract Syntax Tree definitions for M
//!
//! All command and expression nodes carry a [`Span`] via composition: the
//! node struct holds the span, its `kind`/`body` enum holds the variant data.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::parser::span::Span;

/// A parsed program: the flat command list plus its tag table
#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub commands: Vec<Command>,
    pub tags: BTreeMap<String, Tag>,
}

impl Program {
    /// Look up a tag by exact name
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.get(name)
    }

    /// Tags ordered by their position in the command list
    pub fn tags_in_order(&self) -> Vec<(&str, &Tag)> {
        let mut tags: Vec<_> = self.tags.iter().map(|(n, t)| (n.as_str(), t)).collect();
        tags.sort_by_key(|(_, tag)| tag.index);
        tags
    }
}

/// A named entry point into the command list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tag {
    /// Index of the first command belonging to the tag
    pub index: usize,
    /// Formal parameters, if the tag declares a parameter list
    pub params: Option<Vec<String>>,
}

/// A command with its optional postcondition
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub span: Span,
    pub postcondition: Option<Expr>,
    pub body: CommandBody,
}

/// Command bodies
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum CommandBody {
    Write {
        args: Vec<WriteArg>,
    },
    Quit {
        value: Option<Expr>,
    },
    /// `do` followed by an indented block on the following lines
    DoBlock {
        block: Vec<Command>,
    },
    /// `do` with one or more subroutine targets
    Do {
        calls: Vec<Call>,
    },
    If {
        conditions: Vec<Expr>,
        children: Vec<Command>,
    },
    Else {
        children: Vec<Command>,
    },
    For {
        argument: Option<ForArgument>,
        children: Vec<Command>,
    },
    Set {
        args: Vec<SetArg>,
    },
    New {
        names: Vec<Identifier>,
    },
    Kill {
        targets: Vec<Variable>,
    },
    Merge {
        args: Vec<MergeArg>,
    },
    Comment {
        text: String,
    },
    Halt,
}

/// One argument of `write`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WriteArg {
    /// `!` starts a new line
    Newline,
    /// `#` clears everything written so far
    Clear,
    Expr { expr: Expr },
}

/// `variable=start[:increment[:end]]`
#[derive(Debug, Clone, Serialize)]
pub struct ForArgument {
    pub span: Span,
    pub variable: Variable,
    pub start: Expr,
    pub increment: Option<Expr>,
    pub end: Option<Expr>,
}

/// One `target=value` pair of `set`
#[derive(Debug, Clone, Serialize)]
pub struct SetArg {
    pub span: Span,
    pub target: SetTarget,
    pub value: Expr,
}

/// The left-hand side of a `set` assignment
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SetTarget {
    Variable {
        variable: Variable,
    },
    /// `$Extract(var,start,end)` replaces a character range in place
    Extract {
        variable: Variable,
        start: Option<Expr>,
        end: Option<Expr>,
    },
}

/// One `destination=source` pair of `merge`
#[derive(Debug, Clone, Serialize)]
pub struct MergeArg {
    pub span: Span,
    pub destination: Variable,
    pub source: Variable,
}

/// A bare name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

/// A variable reference with its subscripts
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    pub span: Span,
    pub name: String,
    /// `^name` variables live in the global store
    pub global: bool,
    pub subscripts: Vec<Expr>,
}

impl Variable {
    /// A variable without subscripts denotes a scalar
    pub fn is_scalar(&self) -> bool {
        self.subscripts.is_empty()
    }
}

/// A call to a tag or extern, from `do` or `$$`
#[derive(Debug, Clone, Serialize)]
pub struct Call {
    pub span: Span,
    pub name: Identifier,
    pub args: Vec<Argument>,
}

/// An actual argument of a call
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Argument {
    Value { expr: Expr },
    /// `.name` passes the variable itself
    Reference { name: Identifier },
}

/// An expression node
#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, kind: ExprKind) -> Self {
        Self { span, kind }
    }
}

/// Expression variants
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ExprKind {
    Variable {
        variable: Variable,
    },
    NumberLiteral {
        value: f64,
    },
    StringLiteral {
        value: String,
    },
    /// `$$name(args)`
    Call {
        call: Call,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        /// `'` prefix inverts the boolean result
        negated: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Builtin {
        function: BuiltinFunction,
        args: Vec<Expr>,
    },
    SpecialVariable {
        variable: SpecialVariable,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Not,
    Plus,
    Minus,
}

/// Binary operators; all share one precedence level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Or,
    And,
    Equals,
    Less,
    Greater,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl BinaryOp {
    /// Whether a `'` prefix may invert this operator
    pub fn is_negatable(self) -> bool {
        matches!(
            self,
            BinaryOp::Or | BinaryOp::And | BinaryOp::Equals | BinaryOp::Less | BinaryOp::Greater
        )
    }
}

/// `$` intrinsic functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuiltinFunction {
    Ascii,
    Char,
    Extract,
    Find,
    Length,
    Order,
    Piece,
    Select,
}

/// Intrinsic functions, matched by "full name starts with the typed name"
pub const BUILTINS: &[(&str, BuiltinFunction)] = &[
    ("ascii", BuiltinFunction::Ascii),
    ("char", BuiltinFunction::Char),
    ("extract", BuiltinFunction::Extract),
    ("find", BuiltinFunction::Find),
    ("length", BuiltinFunction::Length),
    ("order", BuiltinFunction::Order),
    ("piece", BuiltinFunction::Piece),
    ("select", BuiltinFunction::Select),
];

/// `$` special variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpecialVariable {
    Test,
}

pub const SPECIAL_VARIABLES: &[(&str, SpecialVariable)] = &[("test", SpecialVariable::Test)];

/// Resolve an abbreviation against a name table, case-insensitively.
///
/// The first entry whose full name starts with `abbreviation` wins.
pub fn resolve_abbreviation<T: Copy>(table: &[(&str, T)], abbreviation: &str) -> Option<T> {
    if abbreviation.is_empty() {
        return None;
    }
    let lowered = abbreviation.to_ascii_lowercase();
    table
        .iter()
        .find(|(full, _)| full.starts_with(lowered.as_str()))
        .map(|(_, value)| *value)
}
