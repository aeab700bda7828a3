//! Arithmetic on variables: `\advance`, `\multiply` and `\divide`.

use common::{ArithmeticError, Glue, Scaled};
use texweave::command::{self, Command};
use texweave::error;
use texweave::group::{Address, Binding, ValueType};
use texweave::parse::{self, OptionalBy};
use texweave::prelude as txl;
use texweave::token::{Token, Value};
use texweave::traits::*;
use texweave::vm;

pub(crate) static VARIABLE_OP_TAG: command::StaticTag = command::StaticTag::new();

/// Get the `\advance` command.
pub fn get_advance<S: TexweaveState>() -> command::BuiltIn<S> {
    new_op(advance_fn, "Add a value to a variable")
}

/// Get the `\multiply` command.
pub fn get_multiply<S: TexweaveState>() -> command::BuiltIn<S> {
    new_op(multiply_fn, "Multiply a variable by an integer")
}

/// Get the `\divide` command.
pub fn get_divide<S: TexweaveState>() -> command::BuiltIn<S> {
    new_op(divide_fn, "Divide a variable by an integer")
}

fn new_op<S: TexweaveState>(f: command::ExecutionFn<S>, doc: &'static str) -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(f)
        .with_tag(VARIABLE_OP_TAG.get())
        .with_doc(doc)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Advance,
    Multiply,
    Divide,
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Advance => "\\advance",
            Op::Multiply => "\\multiply",
            Op::Divide => "\\divide",
        }
    }
}

fn advance_fn<S: TexweaveState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    apply(token, input, Op::Advance)
}

fn multiply_fn<S: TexweaveState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    apply(token, input, Op::Multiply)
}

fn divide_fn<S: TexweaveState>(token: Token, input: &mut vm::ExecutionInput<S>) -> txl::Result<()> {
    apply(token, input, Op::Divide)
}

#[derive(Debug)]
struct VariableEndOfInputError(Op);

impl error::EndOfInputError for VariableEndOfInputError {
    fn doing(&self) -> String {
        format!("reading the variable after {}", self.0.name())
    }
}

fn apply<S: TexweaveState>(
    op_token: Token,
    input: &mut vm::ExecutionInput<S>,
    op: Op,
) -> txl::Result<()> {
    let scope = input.assignment_scope();
    let token = input.next_or_err(VariableEndOfInputError(op))?;
    let cmd = match token.value() {
        Value::CommandRef(command_ref) => match input.vm().chain().command(&command_ref) {
            Some(Command::Variable(cmd)) => Some(cmd.clone()),
            _ => None,
        },
        _ => None,
    };
    let Some(cmd) = cmd else {
        return Err(error::SimpleTokenError::new(
            input.vm(),
            token,
            format!("expected a variable after {}", op.name()),
        )
        .with_note("the variable may be a register like \\count 1 or a parameter like \\mag")
        .into());
    };
    let address = cmd.resolve(token, input.as_mut())?;
    if !is_arithmetic(address) {
        return Err(error::SimpleTokenError::new(
            input.vm(),
            token,
            format!("you can't use this variable after {}", op.name()),
        )
        .with_note("only integer, dimension and glue registers and parameters support arithmetic")
        .into());
    }
    OptionalBy::parse(input)?;
    let result = match op {
        Op::Advance => advance(address, input),
        Op::Multiply => {
            let n = i32::parse(input)?;
            multiply(address, input.vm(), n)
        }
        Op::Divide => {
            let n = i32::parse(input)?;
            if n == 0 {
                input.vm().error(
                    error::SimpleTokenError::new(input.vm(), op_token, "arithmetic overflow")
                        .with_category(error::Category::Arithmetic)
                        .with_note("the divisor is zero; the variable is left unchanged"),
                )?;
                return Ok(());
            }
            divide(address, input.vm(), n)
        }
    };
    let binding = match result? {
        Ok(binding) => binding,
        Err(err) => {
            return Err(error::SimpleTokenError::new(input.vm(), op_token, err.to_string())
                .with_category(error::Category::Arithmetic)
                .with_note(format!(
                    "the result of {} is outside the range of the variable",
                    op.name()
                ))
                .into());
        }
    };
    log::trace!("{} assigning {binding:?} to {address:?} ({scope:?})", op.name());
    input.chain_mut().set(address, binding, scope);
    Ok(())
}

fn is_arithmetic(address: Address) -> bool {
    matches!(
        address,
        Address::Count(_)
            | Address::Dimen(_)
            | Address::Skip(_)
            | Address::MuSkip(_)
            | Address::Integer(_)
            | Address::Dimension(_)
            | Address::MuGlue(_)
    )
}

type OpResult<S> = txl::Result<Result<Binding<S>, ArithmeticError>>;

fn advance<S: TexweaveState>(address: Address, input: &mut vm::ExecutionInput<S>) -> OpResult<S> {
    Ok(match address.value_type() {
        ValueType::Integer => {
            let lhs = input.vm().chain().integer(address);
            let rhs = i32::parse(input)?;
            Ok(Binding::Integer(lhs.wrapping_add(rhs)))
        }
        ValueType::Dimen => {
            let lhs = input.vm().chain().dimen(address);
            let rhs = Scaled::parse(input)?;
            lhs.checked_add(rhs).map(Binding::Dimen)
        }
        ValueType::Glue => {
            let lhs = input.vm().chain().glue(address);
            let rhs = Glue::parse(input)?;
            lhs.checked_add(rhs).map(Binding::Glue)
        }
        _ => {
            let lhs = input.vm().chain().glue(address);
            let parse::MuGlue(rhs) = parse::MuGlue::parse(input)?;
            lhs.checked_add(rhs).map(Binding::Glue)
        }
    })
}

fn multiply<S: TexweaveState>(address: Address, vm: &vm::VM<S>, n: i32) -> OpResult<S> {
    let chain = vm.chain();
    Ok(match address.value_type() {
        ValueType::Integer => chain
            .integer(address)
            .checked_mul(n)
            .map(Binding::Integer)
            .ok_or(ArithmeticError::Overflow),
        ValueType::Dimen => chain
            .dimen(address)
            .nx_plus_y(n, Scaled::ZERO)
            .map(Binding::Dimen),
        _ => chain.glue(address).multiply(n as i64, 1).map(Binding::Glue),
    })
}

/// Division truncates towards zero.
fn divide<S: TexweaveState>(address: Address, vm: &vm::VM<S>, n: i32) -> OpResult<S> {
    let chain = vm.chain();
    Ok(match address.value_type() {
        ValueType::Integer => chain
            .integer(address)
            .checked_div(n)
            .map(Binding::Integer)
            .ok_or(ArithmeticError::Overflow),
        ValueType::Dimen => chain
            .dimen(address)
            .x_over_n(n)
            .map(|(quotient, _)| Binding::Dimen(quotient)),
        _ => chain.glue(address).multiply(1, n as i64).map(Binding::Glue),
    })
}
