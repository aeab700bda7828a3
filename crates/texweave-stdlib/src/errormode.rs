//! Commands that control what to do when errors occur
//!
//! The commands in this module have ownership over the recoverable error hook.
//! In error stop mode a recoverable error aborts the job.
//! In the other modes it is reported and the job continues with TeX's recovery value.

use std::cell::Cell;
use std::io::Write;
use texweave::command;
use texweave::config::InteractionMode;
use texweave::error;
use texweave::prelude as txl;
use texweave::traits::*;
use texweave::vm;

/// Component holding the interaction mode and the number of errors recovered from.
#[derive(Default)]
pub struct Component {
    mode: InteractionMode,
    num_errors: Cell<usize>,
}

impl Component {
    pub fn new(mode: InteractionMode) -> Component {
        Component {
            mode,
            num_errors: Cell::new(0),
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Number of recoverable errors that were reported and did not abort the job.
    pub fn num_errors(&self) -> usize {
        self.num_errors.get()
    }
}

macro_rules! mode_command {
    ($getter: ident, $mode: expr, $doc: expr) => {
        #[doc = concat!("Get the `\\", stringify!($getter), "` command.")]
        pub fn $getter<S: HasComponent<Component>>() -> command::BuiltIn<S> {
            command::BuiltIn::new_execution(|_, input: &mut vm::ExecutionInput<S>| {
                set_mode(input, $mode);
                Ok(())
            })
            .with_doc($doc)
        }
    };
}

mode_command!(
    get_errorstopmode,
    InteractionMode::ErrorStop,
    "Stop at the next recoverable error"
);
mode_command!(
    get_scrollmode,
    InteractionMode::Scroll,
    "Print recoverable errors and continue"
);
mode_command!(
    get_nonstopmode,
    InteractionMode::NonStop,
    "Print recoverable errors and continue without reading the terminal"
);
mode_command!(
    get_batchmode,
    InteractionMode::Batch,
    "Only log recoverable errors and continue"
);

fn set_mode<S: HasComponent<Component>>(input: &mut vm::ExecutionInput<S>, mode: InteractionMode) {
    log::debug!("switching to {}", mode.name());
    input.state_mut().component_mut().mode = mode;
}

/// Recoverable error hook that implements the interaction modes.
pub fn recoverable_error_hook<S: HasComponent<Component>>(
    vm: &vm::VM<S>,
    recoverable_error: Box<error::Error>,
) -> txl::Result<()> {
    let component = vm.state.component();
    match component.mode {
        InteractionMode::ErrorStop => return Err(recoverable_error),
        InteractionMode::Scroll | InteractionMode::NonStop => {
            write_diagnostic(&vm.terminal_out, &recoverable_error);
        }
        InteractionMode::Batch => {}
    }
    write_diagnostic(&vm.log_file, &recoverable_error);
    component.num_errors.set(component.num_errors.get() + 1);
    Ok(())
}

fn write_diagnostic(out: &std::rc::Rc<std::cell::RefCell<dyn Write>>, err: &error::Error) {
    if let Err(io_err) = writeln!(out.borrow_mut(), "{err}") {
        log::warn!("failed to write diagnostic `{}`: {io_err}", err.title());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use texweave::vm::VM;

    struct Output {
        terminal: Rc<RefCell<Vec<u8>>>,
        log: Rc<RefCell<Vec<u8>>>,
        num_errors: usize,
        result: txl::Result<()>,
    }

    fn run(source: &str) -> Output {
        colored::control::set_override(false);
        let terminal: Rc<RefCell<Vec<u8>>> = Default::default();
        let log: Rc<RefCell<Vec<u8>>> = Default::default();
        let mut vm = VM::<crate::StdLibState>::new(crate::all_built_ins());
        vm.set_plain_tex_cat_codes();
        vm.terminal_out = terminal.clone();
        vm.log_file = log.clone();
        vm.push_source("input.tex", source);
        let result = vm.run::<crate::StdLibHandlers>();
        Output {
            terminal,
            log,
            num_errors: vm.state.errormode.num_errors(),
            result,
        }
    }

    const INPUT: &str = r"\count1=1 \divide\count1 by 0 \count2=2";

    #[test]
    fn errorstopmode_aborts() {
        let output = run(INPUT);
        assert!(output.result.is_err());
        assert_eq!(output.num_errors, 0);
    }

    #[test]
    fn scrollmode_prints_and_continues() {
        let output = run(&format!(r"\scrollmode {INPUT}"));
        assert!(output.result.is_ok());
        assert_eq!(output.num_errors, 1);
        assert!(!output.terminal.borrow().is_empty());
        assert!(!output.log.borrow().is_empty());
    }

    #[test]
    fn nonstopmode_prints_and_continues() {
        let output = run(&format!(r"\nonstopmode {INPUT}"));
        assert!(output.result.is_ok());
        assert!(!output.terminal.borrow().is_empty());
    }

    #[test]
    fn batchmode_only_logs() {
        let output = run(&format!(r"\batchmode {INPUT}"));
        assert!(output.result.is_ok());
        assert_eq!(output.num_errors, 1);
        assert!(output.terminal.borrow().is_empty());
        assert!(!output.log.borrow().is_empty());
    }

    #[test]
    fn mode_switch_is_not_scoped() {
        let output = run(&format!(r"{{\batchmode}}{INPUT}"));
        assert!(output.result.is_ok());
    }

    #[test]
    fn back_to_errorstopmode() {
        let output = run(&format!(r"\batchmode\errorstopmode {INPUT}"));
        assert!(output.result.is_err());
    }
}
