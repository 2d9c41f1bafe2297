//! Error code definitions

/// Lexical errors (E0xxx)
pub mod lexical {
    pub const UNEXPECTED_CHARACTER: &str = "E0001";
    pub const UNTERMINATED_STRING: &str = "E0002";
}

/// Syntax errors (E1xxx)
pub mod syntax {
    pub const UNEXPECTED_TOKEN: &str = "E1001";
    pub const UNKNOWN_COMMAND: &str = "E1002";
    pub const UNKNOWN_BUILTIN: &str = "E1003";
    pub const UNTERMINATED_LIST: &str = "E1004";
    pub const MISSING_SPACE: &str = "E1005";
    pub const INVALID_SET_TARGET: &str = "E1006";
    pub const INVALID_LINE_START: &str = "E1007";
}

/// Runtime errors (E4xxx)
pub mod runtime {
    pub const TAG_NOT_FOUND: &str = "E4001";
    pub const MERGE_OVERLAP: &str = "E4002";
    pub const SELECT_EXHAUSTED: &str = "E4003";
    pub const DIVISION_BY_ZERO: &str = "E4004";
    pub const INVALID_ARGUMENT: &str = "E4005";
    pub const NO_ENTRY_POINT: &str = "E4006";
    pub const CALL_DEPTH_EXCEEDED: &str = "E4007";
}

/// Every known code, in explanation order
pub const ALL: &[&str] = &[
    lexical::UNEXPECTED_CHARACTER,
    lexical::UNTERMINATED_STRING,
    syntax::UNEXPECTED_TOKEN,
    syntax::UNKNOWN_COMMAND,
    syntax::UNKNOWN_BUILTIN,
    syntax::UNTERMINATED_LIST,
    syntax::MISSING_SPACE,
    syntax::INVALID_SET_TARGET,
    syntax::INVALID_LINE_START,
    runtime::TAG_NOT_FOUND,
    runtime::MERGE_OVERLAP,
    runtime::SELECT_EXHAUSTED,
    runtime::DIVISION_BY_ZERO,
    runtime::INVALID_ARGUMENT,
    runtime::NO_ENTRY_POINT,
    runtime::CALL_DEPTH_EXCEEDED,
];
