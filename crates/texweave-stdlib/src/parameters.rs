//! Named parameters like `\mag`, `\mathsurround` and `\everymath`.
//!
//! Every parameter is a static variable command.
//! The plain TeX values of the parameters are set by the format preamble, not here.

use texweave::command;
use texweave::group::{
    Address, DimenParameter, IntegerParameter, MuGlueParameter, TokenListParameter,
};
use texweave::traits::*;
use texweave::variable;

/// Returns the commands for all of the named parameters.
pub fn get_all<S: TexweaveState>() -> Vec<(&'static str, command::BuiltIn<S>)> {
    let integers = IntegerParameter::ALL
        .iter()
        .map(|p| (p.name(), Address::Integer(*p)));
    let dimens = DimenParameter::ALL
        .iter()
        .map(|p| (p.name(), Address::Dimension(*p)));
    let mu_glues = MuGlueParameter::ALL
        .iter()
        .map(|p| (p.name(), Address::MuGlue(*p)));
    let token_lists = TokenListParameter::ALL
        .iter()
        .map(|p| (p.name(), Address::TokenList(*p)));
    integers
        .chain(dimens)
        .chain(mu_glues)
        .chain(token_lists)
        .map(|(name, address)| {
            (
                name,
                command::BuiltIn::new_variable(variable::Command::new_static(address)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::testing::*;

    test_suite![
        expansion_equality_tests(
            (mag_default, r"\the\mag", "1000"),
            (integer_parameter, r"\binoppenalty=700 \the\binoppenalty", "700"),
            (integer_parameter_grouping, r"{\relpenalty=5}\the\relpenalty", "0"),
            (
                dimen_parameter,
                r"\mathsurround=1.5pt \the\mathsurround",
                the_output("1.5pt")
            ),
            (
                mu_glue_parameter,
                r"\thickmuskip=5mu plus 5mu\relax\the\thickmuskip",
                the_output("5.0mu plus 5.0mu")
            ),
            (token_list_parameter, r"\everymath={ab}\the\everymath", "ab"),
            (
                parameter_from_register,
                r"\count7=12 \delimiterfactor=\count7 \the\delimiterfactor",
                "12"
            ),
        ),
        failure_tests(
            (dimen_parameter_missing_unit, r"\scriptspace=3"),
            (mu_glue_parameter_not_mu, r"\medmuskip=3pt"),
        ),
    ];
}
