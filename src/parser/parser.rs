//! Recursive descent parser for M
//!
//! The cursor is `(line, column, next_line)`. Nested regions (`do` blocks and
//! the body of a tag) are parsed by moving `next_line` forward through the
//! indented lines, after which `line`/`column` jump back to where the outer
//! line left off.
#![allow(clippy::result_large_err)]

use crate::diagnostics::{error_codes::syntax, Diagnostic, DiagnosticBag};
use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind, TokenizedLine};
use crate::parser::span::{Position, Span};

type ParseResult<T> = Result<T, Diagnostic>;

/// Parses the body of one command after its name, postcondition and space
type CommandParser<'a> = fn(&mut Parser<'a>, usize) -> ParseResult<CommandBody>;

/// Parser for tokenized M source
pub struct Parser<'a> {
    lines: &'a [TokenizedLine],
    line: usize,
    column: usize,
    next_line: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(lines: &'a [TokenizedLine]) -> Self {
        Self {
            lines,
            line: 0,
            column: 0,
            next_line: 0,
        }
    }

    /// Parse a complete program.
    ///
    /// The first syntax error aborts the whole parse.
    pub fn parse_program(&mut self) -> Result<Program, DiagnosticBag> {
        let mut program = Program::default();
        match self.parse_top_level(&mut program) {
            Ok(()) => {
                tracing::debug!(
                    commands = program.commands.len(),
                    tags = program.tags.len(),
                    "parsed program"
                );
                Ok(program)
            }
            Err(diag) => Err(diag.into()),
        }
    }

    /// Parse a single line of direct-mode input at block level 0
    pub fn parse_direct_line(&mut self) -> Result<Vec<Command>, DiagnosticBag> {
        let mut commands = Vec::new();
        if self.lines.is_empty() {
            return Ok(commands);
        }
        self.line = 0;
        self.column = 0;
        self.next_line = 1;
        if self.check(&TokenKind::LeadingWhitespace) {
            self.advance();
        }
        self.parse_line_commands(0, &mut commands)
            .map_err(DiagnosticBag::from)?;
        Ok(commands)
    }

    fn parse_top_level(&mut self, program: &mut Program) -> ParseResult<()> {
        self.next_line = 0;
        while self.next_line < self.lines.len() {
            self.line = self.next_line;
            self.column = 0;

            match &self.peek().kind {
                TokenKind::TrailingWhitespace | TokenKind::Comment(_) => {
                    self.next_line += 1;
                }
                TokenKind::Identifier(name) => {
                    let name = name.clone();
                    self.next_line += 1;
                    self.advance();

                    let params = if self.check(&TokenKind::LParen) {
                        Some(self.parse_list(|p| p.expect_identifier().map(|id| id.name))?)
                    } else {
                        None
                    };

                    let index = program.commands.len();
                    if program.tags.contains_key(&name) {
                        tracing::debug!(tag = %name, "duplicate tag ignored");
                    } else {
                        program.tags.insert(name, Tag { index, params });
                    }

                    self.expect_space_or_eol()?;
                    self.parse_line_commands(0, &mut program.commands)?;
                    let block = self.parse_block(0, true)?;
                    program.commands.extend(block);
                }
                TokenKind::LeadingWhitespace => {
                    let block = self.parse_block(0, false)?;
                    program.commands.extend(block);
                }
                other => {
                    return Err(self.error_here(
                        syntax::INVALID_LINE_START,
                        format!("Expected tag or indentation, found {}", other.describe()),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parse the lines of a block at `level` dots of indentation.
    ///
    /// The block ends at the first line without leading whitespace or without
    /// enough `. ` markers; that line is left for the caller.
    fn parse_block(&mut self, level: usize, start_on_next_line: bool) -> ParseResult<Vec<Command>> {
        let mut commands = Vec::new();
        if !start_on_next_line {
            self.next_line = self.line;
        }

        while self.next_line < self.lines.len() {
            self.line = self.next_line;
            self.column = 0;
            if !self.consume_indentation(level) {
                self.column = 0;
                break;
            }
            self.next_line += 1;
            self.parse_line_commands(level, &mut commands)?;
        }

        Ok(commands)
    }

    fn consume_indentation(&mut self, level: usize) -> bool {
        if !self.check(&TokenKind::LeadingWhitespace) {
            return false;
        }
        self.advance();
        for _ in 0..level {
            if !self.check(&TokenKind::Dot) {
                return false;
            }
            self.advance();
            if self.check(&TokenKind::Space) {
                self.advance();
            }
        }
        true
    }

    /// Parse commands until the end of the current line
    fn parse_line_commands(&mut self, level: usize, out: &mut Vec<Command>) -> ParseResult<()> {
        loop {
            while self.check(&TokenKind::Space) {
                self.advance();
            }
            if self.at_eol() {
                return Ok(());
            }

            out.push(self.parse_command(level)?);

            if self.check(&TokenKind::Space) {
                self.advance();
            } else if !self.at_eol() {
                return Err(self.error_here(
                    syntax::MISSING_SPACE,
                    format!("Expected space, found {}", self.peek().kind.describe()),
                ));
            }
        }
    }

    fn parse_command(&mut self, level: usize) -> ParseResult<Command> {
        let start = self.position();

        if let TokenKind::Comment(text) = &self.peek().kind {
            let text = text.clone();
            self.advance();
            return Ok(Command {
                span: Span::new(start, self.last_position()),
                postcondition: None,
                body: CommandBody::Comment { text },
            });
        }

        let name_column = self.column;
        let name_token = self.advance();
        let name = match &name_token.kind {
            TokenKind::Identifier(name) => name.clone(),
            other => {
                return Err(self.error_at(
                    name_column,
                    name_token,
                    syntax::UNEXPECTED_TOKEN,
                    format!("Expected command, found {}", other.describe()),
                ))
            }
        };

        let postcondition = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };

        self.expect_space_or_eol()?;

        let handlers: &[(&str, CommandParser<'a>)] = &[
            ("do", Self::parse_do),
            ("else", Self::parse_else),
            ("for", Self::parse_for),
            ("halt", Self::parse_halt),
            ("if", Self::parse_if),
            ("kill", Self::parse_kill),
            ("merge", Self::parse_merge),
            ("new", Self::parse_new),
            ("quit", Self::parse_quit),
            ("set", Self::parse_set),
            ("write", Self::parse_write),
        ];
        let handler = resolve_abbreviation(handlers, &name).ok_or_else(|| {
            self.error_at(
                name_column,
                name_token,
                syntax::UNKNOWN_COMMAND,
                format!("Unknown command '{}'", name),
            )
        })?;

        let body = handler(self, level)?;
        Ok(Command {
            span: Span::new(start, self.last_position()),
            postcondition,
            body,
        })
    }

    fn parse_write(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let mut args = Vec::new();
        if !self.has_argument() {
            return Ok(CommandBody::Write { args });
        }

        loop {
            let mut formatted = false;
            loop {
                if self.check(&TokenKind::Bang) {
                    args.push(WriteArg::Newline);
                } else if self.check(&TokenKind::Hash) {
                    args.push(WriteArg::Clear);
                } else {
                    break;
                }
                self.advance();
                formatted = true;
            }
            if !formatted {
                args.push(WriteArg::Expr {
                    expr: self.parse_expr()?,
                });
            }

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }

        Ok(CommandBody::Write { args })
    }

    fn parse_quit(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let value = if self.has_argument() {
            Some(self.parse_expr()?)
        } else {
            None
        };
        Ok(CommandBody::Quit { value })
    }

    fn parse_do(&mut self, level: usize) -> ParseResult<CommandBody> {
        if !self.has_argument() {
            let (line, column) = (self.line, self.column);
            let block = self.parse_block(level + 1, true)?;
            self.line = line;
            self.column = column;
            return Ok(CommandBody::DoBlock { block });
        }

        let mut calls = vec![self.parse_call()?];
        while self.check(&TokenKind::Comma) {
            self.advance();
            calls.push(self.parse_call()?);
        }
        Ok(CommandBody::Do { calls })
    }

    fn parse_if(&mut self, level: usize) -> ParseResult<CommandBody> {
        let mut conditions = Vec::new();
        if self.has_argument() {
            conditions.push(self.parse_expr()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                conditions.push(self.parse_expr()?);
            }
        }
        let children = self.parse_trailing(level)?;
        Ok(CommandBody::If {
            conditions,
            children,
        })
    }

    fn parse_else(&mut self, level: usize) -> ParseResult<CommandBody> {
        let mut children = Vec::new();
        self.parse_line_commands(level, &mut children)?;
        Ok(CommandBody::Else { children })
    }

    fn parse_for(&mut self, level: usize) -> ParseResult<CommandBody> {
        let argument = if self.has_argument() {
            let start_pos = self.position();
            let variable = self.parse_variable()?;
            self.expect(TokenKind::Equals)?;
            let start = self.parse_expr()?;

            let mut increment = None;
            let mut end = None;
            if self.check(&TokenKind::Colon) {
                self.advance();
                increment = Some(self.parse_expr()?);
                if self.check(&TokenKind::Colon) {
                    self.advance();
                    end = Some(self.parse_expr()?);
                }
            }

            Some(ForArgument {
                span: Span::new(start_pos, self.last_position()),
                variable,
                start,
                increment,
                end,
            })
        } else {
            None
        };

        let children = self.parse_trailing(level)?;
        Ok(CommandBody::For { argument, children })
    }

    fn parse_set(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let mut args = Vec::new();
        loop {
            let start = self.position();
            let target = self.parse_set_target()?;
            self.expect(TokenKind::Equals)?;
            let value = self.parse_expr()?;
            args.push(SetArg {
                span: Span::new(start, self.last_position()),
                target,
                value,
            });

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(CommandBody::Set { args })
    }

    fn parse_set_target(&mut self) -> ParseResult<SetTarget> {
        if !self.check(&TokenKind::Dollar) {
            return Ok(SetTarget::Variable {
                variable: self.parse_variable()?,
            });
        }

        self.advance();
        let name = self.expect_identifier()?;
        if resolve_abbreviation(BUILTINS, &name.name) != Some(BuiltinFunction::Extract) {
            return Err(Diagnostic::error(syntax::INVALID_SET_TARGET)
                .message(format!("${} cannot be assigned to", name.name))
                .at(name.span.start.line, name.span.start.column)
                .build());
        }

        self.expect(TokenKind::LParen)?;
        let variable = self.parse_variable()?;
        let mut start = None;
        let mut end = None;
        if self.check(&TokenKind::Comma) {
            self.advance();
            start = Some(self.parse_expr()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                end = Some(self.parse_expr()?);
            }
        }
        self.expect_closing_paren()?;

        Ok(SetTarget::Extract {
            variable,
            start,
            end,
        })
    }

    fn parse_new(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let mut names = Vec::new();
        if self.has_argument() {
            names.push(self.expect_identifier()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                names.push(self.expect_identifier()?);
            }
        }
        Ok(CommandBody::New { names })
    }

    fn parse_kill(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let mut targets = Vec::new();
        if self.has_argument() {
            targets.push(self.parse_variable()?);
            while self.check(&TokenKind::Comma) {
                self.advance();
                targets.push(self.parse_variable()?);
            }
        }
        Ok(CommandBody::Kill { targets })
    }

    fn parse_merge(&mut self, _level: usize) -> ParseResult<CommandBody> {
        let mut args = Vec::new();
        loop {
            let start = self.position();
            let destination = self.parse_variable()?;
            self.expect(TokenKind::Equals)?;
            let source = self.parse_variable()?;
            args.push(MergeArg {
                span: Span::new(start, self.last_position()),
                destination,
                source,
            });

            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(CommandBody::Merge { args })
    }

    fn parse_halt(&mut self, _level: usize) -> ParseResult<CommandBody> {
        Ok(CommandBody::Halt)
    }

    /// Commands following a command's arguments on the same line
    fn parse_trailing(&mut self, level: usize) -> ParseResult<Vec<Command>> {
        let mut children = Vec::new();
        if self.check(&TokenKind::Space) {
            self.advance();
        } else if !self.at_eol() {
            return Err(self.error_here(
                syntax::MISSING_SPACE,
                format!("Expected space, found {}", self.peek().kind.describe()),
            ));
        }
        self.parse_line_commands(level, &mut children)?;
        Ok(children)
    }

    /// `name` or `name(args)`, as a `do` target or after `$$`
    fn parse_call(&mut self) -> ParseResult<Call> {
        let start = self.position();
        let name = self.expect_identifier()?;
        let args = if self.check(&TokenKind::LParen) {
            self.parse_list(Self::parse_argument)?
        } else {
            Vec::new()
        };
        Ok(Call {
            span: Span::new(start, self.last_position()),
            name,
            args,
        })
    }

    fn parse_argument(&mut self) -> ParseResult<Argument> {
        if self.check(&TokenKind::Dot)
            && matches!(self.peek_at(1).kind, TokenKind::Identifier(_))
        {
            self.advance();
            return Ok(Argument::Reference {
                name: self.expect_identifier()?,
            });
        }
        Ok(Argument::Value {
            expr: self.parse_expr()?,
        })
    }

    fn parse_variable(&mut self) -> ParseResult<Variable> {
        let start = self.position();
        let global = self.check(&TokenKind::Caret);
        if global {
            self.advance();
        }
        let name = self.expect_identifier()?.name;
        let subscripts = if self.check(&TokenKind::LParen) {
            self.parse_list(Self::parse_expr)?
        } else {
            Vec::new()
        };
        Ok(Variable {
            span: Span::new(start, self.last_position()),
            name,
            global,
            subscripts,
        })
    }

    // Expressions

    /// Binary operators all share one precedence level and associate left
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let negated = self.check(&TokenKind::Apostrophe)
                && binary_op(&self.peek_at(1).kind).is_some();
            let op_column = self.column + usize::from(negated);
            let Some(op) = binary_op(&self.peek_at(usize::from(negated)).kind) else {
                break;
            };
            if negated && !op.is_negatable() {
                let token = self.peek_at(1);
                return Err(self.error_at(
                    op_column,
                    token,
                    syntax::UNEXPECTED_TOKEN,
                    format!("Operator {} cannot be negated", token.kind.describe()),
                ));
            }
            if negated {
                self.advance();
            }
            self.advance();

            let right = self.parse_unary()?;
            let span = left.span.merge(&right.span);
            left = Expr::new(
                span,
                ExprKind::BinaryOp {
                    op,
                    negated,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek().kind {
            TokenKind::Apostrophe => UnaryOp::Not,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.parse_primary(),
        };
        let start = self.position();
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::new(
            Span::new(start, operand.span.end),
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = self.position();
        let token = self.peek();

        match &token.kind {
            TokenKind::Number(value) => {
                let value = *value;
                self.advance();
                Ok(Expr::new(
                    Span::new(start, start),
                    ExprKind::NumberLiteral { value },
                ))
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expr::new(
                    Span::new(start, start),
                    ExprKind::StringLiteral { value },
                ))
            }
            TokenKind::Identifier(_) | TokenKind::Caret => {
                let variable = self.parse_variable()?;
                Ok(Expr::new(variable.span, ExprKind::Variable { variable }))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_closing_paren()?;
                Ok(Expr::new(Span::new(start, self.last_position()), inner.kind))
            }
            TokenKind::Dollar => {
                self.advance();
                if self.check(&TokenKind::Dollar) {
                    self.advance();
                    let call = self.parse_call()?;
                    return Ok(Expr::new(
                        Span::new(start, self.last_position()),
                        ExprKind::Call { call },
                    ));
                }
                self.parse_intrinsic(start)
            }
            other => Err(self.error_here(
                syntax::UNEXPECTED_TOKEN,
                format!("Expected expression, found {}", other.describe()),
            )),
        }
    }

    /// `$name(args)` builtin or `$name` special variable
    fn parse_intrinsic(&mut self, start: Position) -> ParseResult<Expr> {
        let name_column = self.column;
        let name_token = self.peek();
        let name = self.expect_identifier()?;

        if !self.check(&TokenKind::LParen) {
            let variable =
                resolve_abbreviation(SPECIAL_VARIABLES, &name.name).ok_or_else(|| {
                    self.error_at(
                        name_column,
                        name_token,
                        syntax::UNKNOWN_BUILTIN,
                        format!("Unknown special variable '${}'", name.name),
                    )
                })?;
            return Ok(Expr::new(
                Span::new(start, self.last_position()),
                ExprKind::SpecialVariable { variable },
            ));
        }

        let function = resolve_abbreviation(BUILTINS, &name.name).ok_or_else(|| {
            self.error_at(
                name_column,
                name_token,
                syntax::UNKNOWN_BUILTIN,
                format!("Unknown builtin '${}'", name.name),
            )
        })?;

        let args = if function == BuiltinFunction::Select {
            self.parse_list(|p| {
                let condition = p.parse_expr()?;
                p.expect(TokenKind::Colon)?;
                let value = p.parse_expr()?;
                Ok([condition, value])
            })?
            .into_iter()
            .flatten()
            .collect()
        } else {
            self.parse_list(Self::parse_expr)?
        };

        Ok(Expr::new(
            Span::new(start, self.last_position()),
            ExprKind::Builtin { function, args },
        ))
    }

    /// `( item, item, ... )`
    fn parse_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        self.expect(TokenKind::LParen)?;
        let mut items = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(items);
        }

        loop {
            items.push(item(self)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            self.expect_closing_paren()?;
            return Ok(items);
        }
    }

    // Helper methods

    fn peek(&self) -> &'a Token {
        self.peek_at(0)
    }

    /// Look ahead within the current line; never passes the end-of-line sentinel
    fn peek_at(&self, offset: usize) -> &'a Token {
        let lines: &'a [TokenizedLine] = self.lines;
        let line = &lines[self.line];
        &line[(self.column + offset).min(line.len() - 1)]
    }

    /// Consume the current token; the end-of-line sentinel is never consumed
    fn advance(&mut self) -> &'a Token {
        let token = self.peek();
        if token.kind != TokenKind::TrailingWhitespace {
            self.column += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn at_eol(&self) -> bool {
        self.check(&TokenKind::TrailingWhitespace)
    }

    /// A command has an argument unless a space or the end of line follows it
    fn has_argument(&self) -> bool {
        !self.at_eol() && !self.check(&TokenKind::Space)
    }

    fn position(&self) -> Position {
        let len = self.lines[self.line].len();
        Position::new(self.line, self.column.min(len - 1))
    }

    fn last_position(&self) -> Position {
        Position::new(self.line, self.column.saturating_sub(1))
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<&'a Token> {
        if self.check(&kind) {
            return Ok(self.advance());
        }
        Err(self.error_here(
            syntax::UNEXPECTED_TOKEN,
            format!(
                "Expected {}, found {}",
                kind.describe(),
                self.peek().kind.describe()
            ),
        ))
    }

    fn expect_closing_paren(&mut self) -> ParseResult<()> {
        if self.at_eol() {
            return Err(self.error_here(
                syntax::UNTERMINATED_LIST,
                "Unterminated list: expected ')' before end of line",
            ));
        }
        self.expect(TokenKind::RParen).map(|_| ())
    }

    fn expect_space_or_eol(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Space) {
            self.advance();
            return Ok(());
        }
        if self.at_eol() {
            return Ok(());
        }
        Err(self.error_here(
            syntax::MISSING_SPACE,
            format!("Expected space, found {}", self.peek().kind.describe()),
        ))
    }

    fn expect_identifier(&mut self) -> ParseResult<Identifier> {
        let position = self.position();
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            self.advance();
            return Ok(Identifier {
                span: Span::new(position, position),
                name,
            });
        }
        Err(self.error_here(
            syntax::UNEXPECTED_TOKEN,
            format!("Expected identifier, found {}", self.peek().kind.describe()),
        ))
    }

    fn error_here(&self, code: &str, message: impl Into<String>) -> Diagnostic {
        let position = self.position();
        self.error_at(position.column, self.peek(), code, message)
    }

    fn error_at(
        &self,
        column: usize,
        token: &Token,
        code: &str,
        message: impl Into<String>,
    ) -> Diagnostic {
        Diagnostic::error(code)
            .message(message)
            .at(self.line, column)
            .range(token.range.clone())
            .build()
    }
}

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Bang => BinaryOp::Or,
        TokenKind::Ampersand => BinaryOp::And,
        TokenKind::Equals => BinaryOp::Equals,
        TokenKind::Less => BinaryOp::Less,
        TokenKind::Greater => BinaryOp::Greater,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Subtract,
        TokenKind::Star => BinaryOp::Multiply,
        TokenKind::Slash => BinaryOp::Divide,
        TokenKind::Hash => BinaryOp::Modulo,
        TokenKind::Underscore => BinaryOp::Concat,
        _ => return None,
    };
    Some(op)
}
