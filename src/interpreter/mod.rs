//! Tree-walking interpreter for M
//!
//! Expressions push exactly one value onto the value stack; their consumers
//! pop it. Commands return a [`Flow`] signal. Runtime errors are recorded as
//! diagnostics at the command that raised them and halt the program.

pub mod builtins;
pub mod environment;
pub mod error;
pub mod externs;
mod stack;
pub mod value;

use std::rc::Rc;

use serde::Serialize;

use crate::array::MArray;
use crate::diagnostics::{Diagnostic, DiagnosticBag};
use crate::parser::ast::*;

pub use environment::{Binding, Environment, MReference};
pub use error::RuntimeError;
pub use externs::{ExternFunction, Externs};
pub use value::MValue;

/// Nested tag calls allowed before a run stops with `E4007`
pub const MAX_CALL_DEPTH: usize = 2_000;

/// Control-flow signal returned by every command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next command
    Continue,
    /// Leave the innermost block or call
    Quit,
    /// Abort the whole program
    Halt,
}

/// Output and errors of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evaluation {
    pub output: String,
    pub errors: Vec<Diagnostic>,
}

impl Evaluation {
    /// A run that never started because an earlier stage failed
    pub fn failed(errors: Vec<Diagnostic>) -> Self {
        Self {
            output: String::new(),
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Tree-walking interpreter over one parsed program
pub struct Interpreter {
    program: Rc<Program>,
    externs: Externs,
    env: Environment,
    /// `^name` variables, one child per name
    globals: MArray,
    stack: Vec<MValue>,
    /// Number of tag calls currently executing
    call_depth: usize,
    /// Written fragments; `#` clears them
    output: Vec<String>,
    errors: Vec<Diagnostic>,
    /// `$TEST`
    test: bool,
}

impl Interpreter {
    pub fn new(program: Program, externs: Externs) -> Self {
        Self {
            program: Rc::new(program),
            externs,
            env: Environment::new(),
            globals: MArray::default(),
            stack: Vec::new(),
            call_depth: 0,
            output: Vec::new(),
            errors: Vec::new(),
            test: false,
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn globals(&self) -> &MArray {
        &self.globals
    }

    /// Forget every local and global variable
    pub fn clear_variables(&mut self) {
        self.env.reset();
        self.globals = MArray::default();
    }

    /// Run the tag `name` with positional arguments
    pub fn run_tag(&mut self, name: &str, args: &[MValue]) -> Evaluation {
        self.begin();
        let Some(tag) = self.program.tag(name).cloned() else {
            self.record(RuntimeError::no_entry_point(name));
            return self.finish();
        };

        if let Some(params) = tag.params.as_ref().filter(|p| !p.is_empty()) {
            self.env.push_scope();
            for (index, param) in params.iter().enumerate() {
                let value = args.get(index).cloned().unwrap_or_default();
                self.env.bind(param.as_str(), Binding::Value(MArray::new(value)));
            }
        }

        self.run_region(tag.index);
        self.finish()
    }

    /// Run from the `main` tag, or from the first command if there is none
    pub fn run_main(&mut self) -> Evaluation {
        if self.program.tag("main").is_some() {
            return self.run_tag("main", &[]);
        }
        self.begin();
        self.run_region(0);
        self.finish()
    }

    /// Run commands that are not part of the program, against the same state
    pub fn run_commands(&mut self, commands: &[Command]) -> Evaluation {
        self.begin();
        self.exec_commands(commands);
        self.finish()
    }

    fn begin(&mut self) {
        self.stack.clear();
        self.call_depth = 0;
        self.output.clear();
        self.errors.clear();
        self.env.truncate(1);
    }

    fn finish(&mut self) -> Evaluation {
        self.env.truncate(1);
        self.stack.clear();
        Evaluation {
            output: std::mem::take(&mut self.output).concat(),
            errors: std::mem::take(&mut self.errors),
        }
    }

    fn record(&mut self, error: RuntimeError) {
        if error.is_halted() {
            return;
        }
        tracing::warn!(code = error.code, message = %error.message, "runtime error");
        self.errors.push(error.to_diagnostic());
    }

    /// Execute the program from `index` until a quit or halt (or the end)
    fn run_region(&mut self, index: usize) -> Flow {
        let program = Rc::clone(&self.program);
        let commands = program.commands.get(index..).unwrap_or_default();
        self.exec_commands(commands)
    }

    fn exec_commands(&mut self, commands: &[Command]) -> Flow {
        for command in commands {
            let flow = match self.exec_command(command) {
                Ok(flow) => flow,
                Err(error) => {
                    self.record(error.with_span(command.span));
                    Flow::Halt
                }
            };
            if flow != Flow::Continue {
                return flow;
            }
        }
        Flow::Continue
    }

    fn exec_command(&mut self, command: &Command) -> Result<Flow, RuntimeError> {
        if let Some(condition) = &command.postcondition {
            if !self.eval_value(condition)?.is_truthy() {
                return Ok(Flow::Continue);
            }
        }

        match &command.body {
            CommandBody::Write { args } => {
                self.exec_write(args)?;
                Ok(Flow::Continue)
            }
            CommandBody::Quit { value } => {
                if let Some(value) = value {
                    self.eval(value)?;
                }
                Ok(Flow::Quit)
            }
            CommandBody::DoBlock { block } => {
                let env_depth = self.env.depth();
                let stack_depth = self.stack.len();
                let flow = self.exec_commands(block);
                self.env.truncate(env_depth);
                self.stack.truncate(stack_depth);
                Ok(match flow {
                    Flow::Halt => Flow::Halt,
                    Flow::Continue | Flow::Quit => Flow::Continue,
                })
            }
            CommandBody::Do { calls } => {
                for call in calls {
                    self.call(call, false)?;
                }
                Ok(Flow::Continue)
            }
            CommandBody::If {
                conditions,
                children,
            } => {
                if !conditions.is_empty() {
                    let mut all_true = true;
                    for condition in conditions {
                        if !self.eval_value(condition)?.is_truthy() {
                            all_true = false;
                            break;
                        }
                    }
                    self.test = all_true;
                }
                if self.test {
                    Ok(self.exec_commands(children))
                } else {
                    Ok(Flow::Continue)
                }
            }
            CommandBody::Else { children } => {
                if self.test {
                    Ok(Flow::Continue)
                } else {
                    Ok(self.exec_commands(children))
                }
            }
            CommandBody::For { argument, children } => self.exec_for(argument.as_ref(), children),
            CommandBody::Set { args } => {
                self.exec_set(args)?;
                Ok(Flow::Continue)
            }
            CommandBody::New { names } => {
                if names.is_empty() {
                    self.env.push_exclusive_scope();
                } else {
                    self.env.push_scope();
                    for name in names {
                        self.env
                            .bind(name.name.as_str(), Binding::Value(MArray::default()));
                    }
                }
                Ok(Flow::Continue)
            }
            CommandBody::Kill { targets } => {
                self.exec_kill(targets)?;
                Ok(Flow::Continue)
            }
            CommandBody::Merge { args } => {
                self.exec_merge(args)?;
                Ok(Flow::Continue)
            }
            CommandBody::Comment { .. } => Ok(Flow::Continue),
            CommandBody::Halt => Ok(Flow::Halt),
        }
    }

    fn exec_write(&mut self, args: &[WriteArg]) -> Result<(), RuntimeError> {
        for arg in args {
            match arg {
                WriteArg::Newline => self.output.push("\n".to_string()),
                WriteArg::Clear => self.output.clear(),
                WriteArg::Expr { expr } => {
                    let value = self.eval_value(expr)?;
                    self.output.push(value.to_string());
                }
            }
        }
        Ok(())
    }

    fn exec_for(
        &mut self,
        argument: Option<&ForArgument>,
        children: &[Command],
    ) -> Result<Flow, RuntimeError> {
        let Some(argument) = argument else {
            loop {
                match self.exec_commands(children) {
                    Flow::Continue => {}
                    Flow::Quit => return Ok(Flow::Continue),
                    Flow::Halt => return Ok(Flow::Halt),
                }
            }
        };

        let start = self.eval_value(&argument.start)?;
        self.assign(&argument.variable, start)?;

        let Some(increment) = &argument.increment else {
            return Ok(match self.exec_commands(children) {
                Flow::Halt => Flow::Halt,
                Flow::Continue | Flow::Quit => Flow::Continue,
            });
        };
        let increment = self.eval_value(increment)?.to_number();
        let end = match &argument.end {
            Some(end) => Some(self.eval_value(end)?.to_number()),
            None => None,
        };

        loop {
            if let Some(end) = end {
                let current = self.read_variable(&argument.variable)?.to_number();
                let past_end = if increment >= 0.0 {
                    current > end
                } else {
                    current < end
                };
                if past_end {
                    break;
                }
            }

            match self.exec_commands(children) {
                Flow::Continue => {}
                Flow::Quit => break,
                Flow::Halt => return Ok(Flow::Halt),
            }

            let current = self.read_variable(&argument.variable)?.to_number();
            self.assign(&argument.variable, MValue::Num(current + increment))?;
        }

        Ok(Flow::Continue)
    }

    fn exec_set(&mut self, args: &[SetArg]) -> Result<(), RuntimeError> {
        for arg in args {
            let value = self.eval_value(&arg.value)?;
            match &arg.target {
                SetTarget::Variable { variable } => self.assign(variable, value)?,
                SetTarget::Extract {
                    variable,
                    start,
                    end,
                } => {
                    let start = match start {
                        Some(start) => builtins::to_integer(&self.eval_value(start)?),
                        None => 1,
                    };
                    let end = match end {
                        Some(end) => builtins::to_integer(&self.eval_value(end)?),
                        None => start,
                    };
                    let current = self.read_variable(variable)?.to_string();
                    let replaced =
                        builtins::replace_extract(&current, start, end, &value.to_string())?;
                    self.assign(variable, MValue::Str(replaced))?;
                }
            }
        }
        Ok(())
    }

    fn exec_kill(&mut self, targets: &[Variable]) -> Result<(), RuntimeError> {
        if targets.is_empty() {
            self.env.reset();
            return Ok(());
        }

        for target in targets {
            let path = self.subscripts(target)?;
            if target.global {
                let mut full_path = vec![target.name.clone()];
                full_path.extend(path);
                self.globals.kill_path(&full_path);
            } else if path.is_empty() {
                self.env.kill(&target.name);
            } else if self.env.get(&target.name).is_some() {
                self.env.get_or_insert(&target.name).kill_path(&path);
            }
        }
        Ok(())
    }

    fn exec_merge(&mut self, args: &[MergeArg]) -> Result<(), RuntimeError> {
        for arg in args {
            let destination_path = self.subscripts(&arg.destination)?;
            let source_path = self.subscripts(&arg.source)?;

            let same_root = arg.destination.global == arg.source.global
                && if arg.destination.global {
                    arg.destination.name == arg.source.name
                } else {
                    self.env.resolve(&arg.destination.name) == self.env.resolve(&arg.source.name)
                };
            if same_root
                && (destination_path.starts_with(&source_path)
                    || source_path.starts_with(&destination_path))
            {
                return Err(RuntimeError::merge_overlap(&arg.destination.name).with_span(arg.span));
            }

            let source = self
                .variable_root(&arg.source.name, arg.source.global)
                .and_then(|root| root.lookup(&source_path))
                .cloned();
            if let Some(source) = source {
                self.variable_node_mut(&arg.destination.name, arg.destination.global, &destination_path)
                    .merge_from(&source);
            }
        }
        Ok(())
    }

    /// Call a tag, or an extern when no tag has that name.
    ///
    /// With `wants_value` exactly one value is left on the stack afterwards;
    /// otherwise the stack is restored to its depth before the call.
    fn call(&mut self, call: &Call, wants_value: bool) -> Result<(), RuntimeError> {
        let program = Rc::clone(&self.program);
        let Some(tag) = program.tag(&call.name.name) else {
            return self.call_extern(call, wants_value);
        };

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::call_depth_exceeded(MAX_CALL_DEPTH).with_span(call.span));
        }

        let stack_depth = self.stack.len();
        let env_depth = self.env.depth();

        if let Some(params) = tag.params.as_ref().filter(|p| !p.is_empty()) {
            let mut bindings = Vec::with_capacity(params.len());
            for (index, param) in params.iter().enumerate() {
                let binding = match call.args.get(index) {
                    Some(Argument::Reference { name }) => {
                        Binding::Reference(self.env.resolve(&name.name))
                    }
                    Some(Argument::Value { expr }) => {
                        Binding::Value(MArray::new(self.eval_value(expr)?))
                    }
                    None => Binding::Value(MArray::default()),
                };
                bindings.push((param.as_str(), binding));
            }
            self.env.push_scope();
            for (name, binding) in bindings {
                self.env.bind(name, binding);
            }
        }

        tracing::debug!(tag = %call.name.name, depth = env_depth, "calling tag");
        self.call_depth += 1;
        let flow = stack::ensure_sufficient_stack(|| self.run_region(tag.index));
        self.call_depth -= 1;
        self.env.truncate(env_depth);

        if wants_value {
            let result = if self.stack.len() > stack_depth {
                self.stack.pop().unwrap_or_default()
            } else {
                MValue::empty()
            };
            self.stack.truncate(stack_depth);
            self.stack.push(result);
        } else {
            self.stack.truncate(stack_depth);
        }

        if flow == Flow::Halt {
            return Err(RuntimeError::halted());
        }
        Ok(())
    }

    fn call_extern(&mut self, call: &Call, wants_value: bool) -> Result<(), RuntimeError> {
        let name = call.name.name.as_str();
        let Some(function) = self.externs.get(name) else {
            return Err(RuntimeError::tag_not_found(name).with_span(call.span));
        };

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            let value = match arg {
                Argument::Value { expr } => self.eval_value(expr)?,
                Argument::Reference { name } => self
                    .env
                    .get(&name.name)
                    .map(|array| array.value.clone())
                    .unwrap_or_default(),
            };
            args.push(value);
        }

        tracing::trace!(name, args = args.len(), "calling extern");
        let result = function.call(&args);
        if wants_value {
            self.stack.push(result.unwrap_or_default());
        }
        Ok(())
    }

    // Variables

    fn subscripts(&mut self, variable: &Variable) -> Result<Vec<String>, RuntimeError> {
        let mut path = Vec::with_capacity(variable.subscripts.len());
        for subscript in &variable.subscripts {
            path.push(self.eval_value(subscript)?.to_string());
        }
        Ok(path)
    }

    fn variable_root(&self, name: &str, global: bool) -> Option<&MArray> {
        if global {
            self.globals.child(name)
        } else {
            self.env.get(name)
        }
    }

    fn variable_node_mut(&mut self, name: &str, global: bool, path: &[String]) -> &mut MArray {
        let root = if global {
            self.globals.entry(name)
        } else {
            self.env.get_or_insert(name)
        };
        root.entry_path(path)
    }

    /// Read a variable; anything undefined reads as the empty string
    fn read_variable(&mut self, variable: &Variable) -> Result<MValue, RuntimeError> {
        let path = self.subscripts(variable)?;
        Ok(self
            .variable_root(&variable.name, variable.global)
            .and_then(|root| root.lookup(&path))
            .map(|node| node.value.clone())
            .unwrap_or_default())
    }

    fn assign(&mut self, variable: &Variable, value: MValue) -> Result<(), RuntimeError> {
        let path = self.subscripts(variable)?;
        self.variable_node_mut(&variable.name, variable.global, &path)
            .value = value;
        Ok(())
    }

    // Expressions

    /// Evaluate `expr`, pushing its value
    fn eval(&mut self, expr: &Expr) -> Result<(), RuntimeError> {
        match &expr.kind {
            ExprKind::Variable { variable } => {
                let value = self.read_variable(variable)?;
                self.stack.push(value);
            }
            ExprKind::NumberLiteral { value } => self.stack.push(MValue::Num(*value)),
            ExprKind::StringLiteral { value } => self.stack.push(MValue::Str(value.clone())),
            ExprKind::Call { call } => self.call(call, true)?,
            ExprKind::UnaryOp { op, operand } => {
                let value = self.eval_value(operand)?;
                let result = match op {
                    UnaryOp::Not => MValue::from_bool(!value.is_truthy()),
                    UnaryOp::Plus => MValue::Num(value.to_number()),
                    UnaryOp::Minus => MValue::Num(-value.to_number()),
                };
                self.stack.push(result);
            }
            ExprKind::BinaryOp {
                op,
                negated,
                left,
                right,
            } => {
                let left = self.eval_value(left)?;
                let right = self.eval_value(right)?;
                let result = apply_binary(*op, &left, &right).map_err(|e| e.with_span(expr.span))?;
                self.stack.push(if *negated {
                    MValue::from_bool(!result.is_truthy())
                } else {
                    result
                });
            }
            ExprKind::Builtin { function, args } => {
                let value = self
                    .eval_builtin(*function, args)
                    .map_err(|e| e.with_span(expr.span))?;
                self.stack.push(value);
            }
            ExprKind::SpecialVariable { variable } => {
                let value = self.special_variable(*variable);
                self.stack.push(value);
            }
        }
        Ok(())
    }

    /// Evaluate `expr` and pop its value
    fn eval_value(&mut self, expr: &Expr) -> Result<MValue, RuntimeError> {
        self.eval(expr)?;
        Ok(self.stack.pop().unwrap_or_default())
    }
}

fn apply_binary(op: BinaryOp, left: &MValue, right: &MValue) -> Result<MValue, RuntimeError> {
    let result = match op {
        BinaryOp::Or => MValue::from_bool(left.is_truthy() || right.is_truthy()),
        BinaryOp::And => MValue::from_bool(left.is_truthy() && right.is_truthy()),
        BinaryOp::Equals => MValue::from_bool(left.to_string() == right.to_string()),
        BinaryOp::Less => MValue::from_bool(left.to_number() < right.to_number()),
        BinaryOp::Greater => MValue::from_bool(left.to_number() > right.to_number()),
        BinaryOp::Add => MValue::Num(left.to_number() + right.to_number()),
        BinaryOp::Subtract => MValue::Num(left.to_number() - right.to_number()),
        BinaryOp::Multiply => MValue::Num(left.to_number() * right.to_number()),
        BinaryOp::Divide => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            MValue::Num(left.to_number() / divisor)
        }
        BinaryOp::Modulo => {
            let divisor = right.to_number();
            if divisor == 0.0 {
                return Err(RuntimeError::division_by_zero());
            }
            // The result takes the sign of the divisor
            let dividend = left.to_number();
            MValue::Num(dividend - divisor * (dividend / divisor).floor())
        }
        BinaryOp::Concat => MValue::Str(format!("{}{}", left, right)),
    };
    Ok(result)
}

/// A loaded program plus the persistent state that survives between runs.
///
/// Each run is an independent tree-walk; only scope 0 and the globals carry
/// over, which is what a host re-invoking a frame tag relies on.
pub struct Session {
    interpreter: Interpreter,
}

impl Session {
    /// Tokenize and parse `source`
    pub fn load(source: &str, externs: Externs) -> Result<Self, DiagnosticBag> {
        let program = crate::parser::parse_source(source)?;
        Ok(Self::from_program(program, externs))
    }

    pub fn from_program(program: Program, externs: Externs) -> Self {
        Self {
            interpreter: Interpreter::new(program, externs),
        }
    }

    pub fn program(&self) -> &Program {
        self.interpreter.program()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.program().tag(name).is_some()
    }

    /// Invoke one tag with positional arguments
    #[tracing::instrument(level = "debug", skip(self, args), fields(args = args.len()))]
    pub fn run_tag(&mut self, name: &str, args: &[MValue]) -> Evaluation {
        self.interpreter.run_tag(name, args)
    }

    /// Run from `main` (or the first command)
    pub fn run_main(&mut self) -> Evaluation {
        self.interpreter.run_main()
    }

    /// Parse and run one line of direct-mode input
    pub fn execute_line(&mut self, line: &str) -> Evaluation {
        match crate::parser::parse_direct_line(line) {
            Ok(commands) => self.interpreter.run_commands(&commands),
            Err(bag) => Evaluation::failed(bag.take()),
        }
    }

    /// Defined local variables of the persistent scope
    pub fn variables(&self) -> Vec<(&str, &MArray)> {
        self.interpreter.environment().persistent_variables()
    }

    pub fn globals(&self) -> &MArray {
        self.interpreter.globals()
    }

    pub fn clear_variables(&mut self) {
        self.interpreter.clear_variables();
    }
}
