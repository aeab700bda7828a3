//! The character code tables: `\catcode`, `\lccode`, `\uccode`, `\sfcode`, `\mathcode` and `\delcode`.

use texweave::command;
use texweave::group::Address;
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::variable;
use texweave::vm;

macro_rules! code_command {
    ( $getter: ident, $resolver: ident, $variant: ident, $name: literal, $doc: literal ) => {
        #[doc = concat!("Get the `\\", $name, "` command.")]
        pub fn $getter<S: TexweaveState>() -> command::BuiltIn<S> {
            command::BuiltIn::new_variable(variable::Command::new_dynamic($resolver)).with_doc($doc)
        }

        fn $resolver<S: TexweaveState>(
            _: Token,
            input: &mut vm::ExpandedStream<S>,
        ) -> txl::Result<Address> {
            Ok(Address::$variant(char::parse(input)?))
        }
    };
}

code_command!(get_catcode, catcode_fn, CatCode, "catcode", "Get or set a category code");
code_command!(get_lccode, lccode_fn, LcCode, "lccode", "Get or set a lowercase code");
code_command!(get_uccode, uccode_fn, UcCode, "uccode", "Get or set an uppercase code");
code_command!(get_sfcode, sfcode_fn, SfCode, "sfcode", "Get or set a space factor code");
code_command!(get_mathcode, mathcode_fn, MathCode, "mathcode", "Get or set a math code");
code_command!(get_delcode, delcode_fn, DelCode, "delcode", "Get or set a delimiter code");
