use std::cell::RefCell;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::rc::Rc;

use clap::Parser;
use texweave::config::{self, BackendKind, EngineConfig, InteractionMode, ResourceFinder};
use texweave_stdlib::{format, typeset, StdLibHandlers};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }
    if let Err(err) = Cli::parse().run() {
        if !err.is_empty() {
            eprintln!("{err}");
        }
        std::process::exit(1);
    }
}

/// Typeset a TeX file and write the finished lists.
#[derive(Debug, Parser)]
#[command(name = "texweave", version = "0.1", about, max_term_width(100))]
struct Cli {
    /// Path to the TeX file to typeset.
    file_path: PathBuf,

    /// Directory containing the engine configuration `engine.json`.
    ///
    /// If the directory does not contain the file, or no directory is given,
    ///     the built-in configuration is used.
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Where to write the finished lists. Defaults to standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Where to write the log. By default the log is discarded.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Override the backend in the configuration.
    #[arg(long)]
    backend: Option<Backend>,

    /// Override the interaction mode in the configuration.
    #[arg(long)]
    interaction: Option<Interaction>,

    /// Start from INITEX values without running the plain format preamble.
    #[arg(long)]
    initex: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Backend {
    Text,
    Json,
}

impl From<Backend> for BackendKind {
    fn from(value: Backend) -> Self {
        match value {
            Backend::Text => BackendKind::Text,
            Backend::Json => BackendKind::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Interaction {
    ErrorStop,
    Scroll,
    NonStop,
    Batch,
}

impl From<Interaction> for InteractionMode {
    fn from(value: Interaction) -> Self {
        match value {
            Interaction::ErrorStop => InteractionMode::ErrorStop,
            Interaction::Scroll => InteractionMode::Scroll,
            Interaction::NonStop => InteractionMode::NonStop,
            Interaction::Batch => InteractionMode::Batch,
        }
    }
}

impl Cli {
    fn run(self) -> Result<(), String> {
        let finder: Box<dyn ResourceFinder> = match &self.config_dir {
            None => Box::new(config::BuiltInFinder),
            Some(dir) => Box::new(config::DirectoryFinder::new(dir)),
        };
        let mut config = EngineConfig::load(finder.as_ref()).map_err(|err| err.to_string())?;
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if let Some(interaction) = self.interaction {
            config.interaction = interaction.into();
        }
        log::debug!("engine configuration: {config:?}");

        let source_code = fs::read_to_string(&self.file_path)
            .map_err(|err| format!("failed to read {}: {err}", self.file_path.display()))?;
        let out: Box<dyn Write> = match &self.output {
            None => Box::new(io::stdout()),
            Some(path) => Box::new(io::BufWriter::new(
                fs::File::create(path)
                    .map_err(|err| format!("failed to create {}: {err}", path.display()))?,
            )),
        };

        let mut vm = texweave_stdlib::new_vm(&config, out);
        vm.state.job.set_job_name(&self.file_path);
        if let Some(path) = &self.log_file {
            let file = fs::File::create(path)
                .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
            vm.log_file = Rc::new(RefCell::new(file));
        }
        vm.push_source(&self.file_path, source_code);
        if !self.initex {
            vm.push_source("plain.tex", format::PLAIN);
        }

        let result = vm
            .run::<StdLibHandlers>()
            .and_then(|()| typeset::finish(&mut vm));
        let num_errors = vm.state.errormode.num_errors();
        if num_errors > 0 {
            eprintln!(
                "({num_errors} recoverable error{} in {})",
                if num_errors == 1 { "" } else { "s" },
                vm.state.errormode.mode().name()
            );
        }
        match result {
            Ok(()) => Ok(()),
            Err(err) => Err(format!("{err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn interaction_names() {
        let cli = Cli::parse_from(["texweave", "--interaction", "non-stop", "in.tex"]);
        assert!(matches!(cli.interaction, Some(Interaction::NonStop)));
    }
}
