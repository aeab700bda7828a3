//! Job control: `\jobname` and `\dump`

use texweave::command;
use texweave::error;
use texweave::prelude as txl;
use texweave::token::Token;
use texweave::traits::*;
use texweave::vm;

/// Component holding the name of the current job.
pub struct Component {
    job_name: String,
}

impl Default for Component {
    fn default() -> Self {
        Self {
            job_name: "texput".into(),
        }
    }
}

impl Component {
    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Set the job name based on the path of the main input file.
    pub fn set_job_name(&mut self, file_path: &std::path::Path) {
        if let Some(file_stem) = file_path.file_stem() {
            self.job_name = file_stem.to_string_lossy().into();
        }
    }
}

/// Get the `\jobname` command.
pub fn get_jobname<S: HasComponent<Component>>() -> command::BuiltIn<S> {
    command::BuiltIn::new_expansion(|token, input: &mut vm::ExpansionInput<S>| {
        let job_name = input.state().component().job_name().to_string();
        input.push_string_tokens(token, &job_name);
        Ok(())
    })
    .with_doc("Output the name of the current job")
}

/// Get the `\dump` command.
///
/// At the outermost level this ends the job.
/// Inside a group it is an error and does nothing.
pub fn get_dump<S: TexweaveState>() -> command::BuiltIn<S> {
    command::BuiltIn::new_execution(dump_primitive_fn).with_doc("End the job")
}

fn dump_primitive_fn<S: TexweaveState>(
    token: Token,
    input: &mut vm::ExecutionInput<S>,
) -> txl::Result<()> {
    let level = input.vm().chain().level();
    if level > 0 {
        return input.vm().error(
            error::SimpleTokenError::new(input.vm(), token, "you can't dump inside a group")
                .with_category(error::Category::Scope)
                .with_note(format!(
                    "the current group is at level {level}; \\dump is only allowed at the outermost level"
                )),
        );
    }
    log::debug!("\\dump at the outermost level; ending the job");
    input.end_input();
    Ok(())
}
