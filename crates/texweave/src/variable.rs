//! Variables: registers and parameters stored in the group chain.
//!
//! A variable command like `\count` or `\mathsurround` is _resolved_ to an [Address] in the chain.
//! For parameters the address is fixed;
//!     for registers it depends on the number that follows the command in the input.
//! The address determines the type of the value, and hence how the value is scanned
//!     in an assignment like `\count 4 = 17` and how `\the` prints it.

use crate::group::{Address, Binding, Scope, ValueType};
use crate::parse::OptionalEquals;
use crate::prelude as txl;
use crate::token::{self, CatCode, Token};
use crate::traits::*;
use crate::{error, parse, vm};
use common::{Glue, Scaled};
use font::FontId;
use std::rc::Rc;

/// Specification for how the address of a variable is determined.
pub enum AddressResolver<S> {
    /// A fixed address.
    ///
    /// After `\countdef\A 30` the command `\A` points at the count register 30
    ///     through a static resolver.
    Static(Address),
    /// An address determined by reading the input, as in `\count 4`.
    Dynamic(fn(Token, &mut vm::ExpandedStream<S>) -> txl::Result<Address>),
}

/// A TeX variable command.
pub struct Command<S> {
    resolver: AddressResolver<S>,
}

impl<S> Command<S> {
    /// A command that always refers to the same variable.
    pub fn new_static(address: Address) -> Command<S> {
        Command {
            resolver: AddressResolver::Static(address),
        }
    }

    /// A command whose variable is determined from the input.
    pub fn new_dynamic(
        resolver: fn(Token, &mut vm::ExpandedStream<S>) -> txl::Result<Address>,
    ) -> Command<S> {
        Command {
            resolver: AddressResolver::Dynamic(resolver),
        }
    }
}

impl<S: TexweaveState> Command<S> {
    /// Resolve the command to the address of its variable.
    pub fn resolve(&self, token: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Address> {
        match &self.resolver {
            AddressResolver::Static(address) => Ok(*address),
            AddressResolver::Dynamic(f) => match f(token, input) {
                Ok(address) => Ok(address),
                Err(err) => Err(error::Error::new_propagated(
                    input.vm(),
                    error::OperationKind::VariableAssignment,
                    token,
                    err,
                )),
            },
        }
    }

    /// Resolve the command and return the current value of the variable.
    pub fn value(&self, token: Token, input: &mut vm::ExpandedStream<S>) -> txl::Result<Value> {
        let address = self.resolve(token, input)?;
        Ok(Value::read(input.vm(), address))
    }

    /// Resolve the command and assign a value scanned from the input.
    ///
    /// This is the `\variable = <value>` form of assignment.
    pub fn set_value_using_input(
        &self,
        token: Token,
        input: &mut vm::ExecutionInput<S>,
        scope: Scope,
    ) -> txl::Result<()> {
        let address = self.resolve(token, input.as_mut())?;
        match set_value_using_input(address, input, scope) {
            Ok(()) => Ok(()),
            Err(err) => Err(error::Error::new_propagated(
                input.vm(),
                error::OperationKind::VariableAssignment,
                token,
                err,
            )),
        }
    }
}

/// The value of a variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Dimen(Scaled),
    Glue(Glue),
    MuGlue(Glue),
    TokenList(Rc<Vec<Token>>),
    CatCode(CatCode),
    Font(FontId),
}

impl Value {
    /// Reads the value stored at the address.
    pub fn read<S>(vm: &vm::VM<S>, address: Address) -> Value {
        let chain = vm.chain();
        match address.value_type() {
            ValueType::Integer => Value::Integer(chain.integer(address)),
            ValueType::Dimen => Value::Dimen(chain.dimen(address)),
            ValueType::Glue => Value::Glue(chain.glue(address)),
            ValueType::MuGlue => Value::MuGlue(chain.glue(address)),
            ValueType::TokenList => Value::TokenList(chain.token_list(address)),
            ValueType::CatCode => match address {
                Address::CatCode(c) => Value::CatCode(chain.cat_code(c)),
                _ => Value::CatCode(CatCode::default()),
            },
            ValueType::Font => Value::Font(chain.font(address)),
            ValueType::Command => Value::Integer(0),
        }
    }

    /// Writes the value the way `\the` displays it.
    pub fn display<S>(&self, vm: &vm::VM<S>) -> String {
        match self {
            Value::Integer(i) => format!("{i}"),
            Value::Dimen(d) => format!("{d}"),
            Value::Glue(g) => format!("{g}"),
            Value::MuGlue(g) => {
                let mut s = String::new();
                // Writing to a String never fails.
                let _ = g.write_with_unit(&mut s, "mu");
                s
            }
            Value::TokenList(t) => token::write_tokens(t.iter(), vm.cs_name_interner()),
            Value::CatCode(c) => format!("{}", *c as u8),
            Value::Font(id) => vm.font_identifier(*id),
        }
    }
}

fn set_value_using_input<S: TexweaveState>(
    address: Address,
    input: &mut vm::ExecutionInput<S>,
    scope: Scope,
) -> txl::Result<()> {
    let binding = match address.value_type() {
        ValueType::Integer => {
            OptionalEquals::parse(input)?;
            let i = i32::parse(input)?;
            Binding::Integer(check_code_range(input, address, i)?)
        }
        ValueType::Dimen => {
            OptionalEquals::parse(input)?;
            Binding::Dimen(Scaled::parse(input)?)
        }
        ValueType::Glue => {
            OptionalEquals::parse(input)?;
            Binding::Glue(Glue::parse(input)?)
        }
        ValueType::MuGlue => {
            OptionalEquals::parse(input)?;
            Binding::Glue(parse::MuGlue::parse(input)?.0)
        }
        ValueType::CatCode => {
            OptionalEquals::parse(input)?;
            Binding::CatCode(CatCode::parse(input)?)
        }
        ValueType::TokenList => {
            OptionalEquals::parse(input)?;
            Binding::TokenList(parse::TokenListValue::parse(input)?.0)
        }
        ValueType::Font => {
            OptionalEquals::parse(input)?;
            Binding::Font(FontId::parse(input)?)
        }
        ValueType::Command => {
            return Ok(());
        }
    };
    log::trace!("assigning {binding:?} to {address:?} ({scope:?})");
    input.chain_mut().set(address, binding, scope);
    Ok(())
}

/// Codes stored in the character tables have restricted ranges.
///
/// An out of range value is a recoverable error; the value 0 is used instead.
fn check_code_range<S: TexweaveState>(
    input: &mut vm::ExecutionInput<S>,
    address: Address,
    i: i32,
) -> txl::Result<i32> {
    let (max, name) = match address {
        Address::LcCode(_) | Address::UcCode(_) => (char::MAX as i32, "a character code"),
        Address::SfCode(_) => (32767, "a space factor code"),
        Address::MathCode(_) => (0x8000, "a math code"),
        Address::DelCode(_) => (0xFFFFFF, "a delimiter code"),
        _ => return Ok(i),
    };
    let min = if matches!(address, Address::DelCode(_)) {
        i32::MIN
    } else {
        0
    };
    if i < min || i > max {
        input.vm().error(
            error::SimpleFailedPreconditionError::new(format!(
                "invalid code {i}: expected {name} in the range [0, {max}]"
            ))
            .with_category(error::Category::Syntax),
        )?;
        return Ok(0);
    }
    Ok(i)
}
