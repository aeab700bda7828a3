//! The format preamble.
//!
//! Jobs start from INITEX values.
//! The preamble loads the Computer Modern fonts, assigns them to the four math families
//!     and sets the codes and parameters that plain TeX sets for math typesetting.

/// Preamble with the subset of plain TeX the engine needs for typesetting text and math.
pub const PLAIN: &str = r#"\font\tenrm=cmr10 \font\teni=cmmi10 \font\tensy=cmsy10 \font\tenex=cmex10
\textfont0=\tenrm \scriptfont0=\tenrm \scriptscriptfont0=\tenrm
\textfont1=\teni \scriptfont1=\teni \scriptscriptfont1=\teni
\textfont2=\tensy \scriptfont2=\tensy \scriptscriptfont2=\tensy
\textfont3=\tenex \scriptfont3=\tenex \scriptscriptfont3=\tenex
\mathcode`\+="202B \mathcode`\=="303D \mathcode`\(="4028 \mathcode`\)="5029
\mathcode`\,="613B
\delcode`\(="028300 \delcode`\)="029301 \delcode`\|="26A30C
\sfcode`\.=3000 \sfcode`\?=3000 \sfcode`\!=3000 \sfcode`\:=2000 \sfcode`\;=1500 \sfcode`\,=1250
\delimiterfactor=901 \delimitershortfall=5pt \nulldelimiterspace=1.2pt \scriptspace=0.5pt
\binoppenalty=700 \relpenalty=500
\thinmuskip=3mu \medmuskip=4mu plus 2mu minus 4mu \thickmuskip=5mu plus 5mu
\tenrm
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn plain(source: &str) -> String {
        format!("{PLAIN}{source}")
    }

    test_suite![
        options(
            TestOption::BuiltInCommands(built_in_commands),
            TestOption::CustomVMInitialization(with_default_fonts),
        ),
        expansion_equality_tests(
            (current_font, plain(r"\the\font"), the_output(r"\cmr10")),
            (symbol_font, plain(r"\the\textfont2"), the_output(r"\cmsy10")),
            (extension_font, plain(r"\the\scriptscriptfont3"), the_output(r"\cmex10")),
            (plus_mathcode, plain(r"\the\mathcode`\+"), "8235"),
            (paren_delcode, plain(r"\the\delcode`\("), "164608"),
            (delimiter_factor, plain(r"\the\delimiterfactor"), "901"),
            (
                medmuskip,
                plain(r"\the\medmuskip"),
                the_output("4.0mu plus 2.0mu minus 4.0mu")
            ),
            (period_sfcode, plain(r"\the\sfcode`\."), "3000"),
        ),
    ];
}
