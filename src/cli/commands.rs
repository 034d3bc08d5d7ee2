//! Command dispatch: settings, services and output wiring

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::AllocationRequest;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::CliResult;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{AllocationInput, AllocationMode, AllocationTree};
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Some(Commands::Completion { shell }) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let settings = load_settings(cli)?;
    let forest = settings.forest.clone();
    let container = ServiceContainer::new(settings);

    match &cli.command {
        None | Some(Commands::Show) => cmd_show(&container, forest.as_deref()),
        Some(Commands::Report) => cmd_report(&container, forest.as_deref()),
        Some(Commands::Allocate {
            target,
            mode,
            inputs,
            toml,
        }) => cmd_allocate(&container, forest.as_deref(), target, *mode, inputs, *toml),
        Some(Commands::Config { command }) => cmd_config(&container, forest.as_deref(), command),
        Some(Commands::Completion { .. }) => Ok(()),
    }
}

/// Load layered settings, then apply command-line overrides.
///
/// The forest given with `-f` also selects the local config directory and wins
/// over a configured default forest.
fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let forest_dir = cli.forest.as_deref().map(forest_dir);
    let mut settings = Settings::load(forest_dir)?;

    if let Some(forest) = &cli.forest {
        settings.forest = Some(forest.clone());
    }
    if let Some(dispatch) = cli.dispatch {
        settings.dispatch = dispatch;
    }
    if let Some(redistribution) = cli.redistribution {
        settings.redistribution = redistribution;
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

fn forest_dir(forest: &Path) -> &Path {
    forest
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

fn render_tree(tree: &AllocationTree, precision: usize) -> CliResult<()> {
    output::block(&tree.to_tree_string_with(precision).to_string())?;
    Ok(())
}

#[instrument(skip(container))]
fn cmd_show(container: &ServiceContainer, forest: Option<&Path>) -> CliResult<()> {
    let tree = container.allocation.load_or_sample(forest)?;
    render_tree(&tree, container.settings.precision)
}

#[instrument(skip(container))]
fn cmd_report(container: &ServiceContainer, forest: Option<&Path>) -> CliResult<()> {
    let tree = container.allocation.load_or_sample(forest)?;
    let precision = container.settings.precision;

    output::header(&output::report_heading());
    for row in tree.report() {
        output::info(&output::report_row(&row, precision));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_allocate(
    container: &ServiceContainer,
    forest: Option<&Path>,
    target: &str,
    mode: AllocationMode,
    inputs: &[String],
    toml: bool,
) -> CliResult<()> {
    let tree = container.allocation.load_or_sample(forest)?;
    let requests: Vec<AllocationRequest> = inputs
        .iter()
        .map(|input| AllocationRequest::new(target, mode, input.as_str()))
        .collect();

    let run = container.allocation.apply(&tree, &requests);
    for step in run.skipped() {
        if let Some(reason) = &step.skipped {
            output::warning(&format!(
                "{} {} on {} left the tree unchanged: {}",
                step.request.mode,
                input_text(&step.request),
                step.request.target,
                reason
            ));
        }
    }

    if toml {
        output::block(&container.allocation.export(&run.tree)?)?;
        Ok(())
    } else {
        render_tree(&run.tree, container.settings.precision)
    }
}

fn input_text(request: &AllocationRequest) -> String {
    match &request.input {
        AllocationInput::Text(raw) => format!("{raw:?}"),
        AllocationInput::Number(n) => n.to_string(),
    }
}

#[instrument(skip(container))]
fn cmd_config(
    container: &ServiceContainer,
    forest: Option<&Path>,
    command: &ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::block(&container.settings.to_toml()?)?;
        }
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(no config directory)".to_string());
            output::info(&format!("global: {global}"));
            let local: Option<PathBuf> = forest.map(|f| local_config_path(forest_dir(f)));
            match local {
                Some(path) => output::info(&format!("local:  {}", path.display())),
                None => output::info("local:  (no forest file)"),
            }
        }
        ConfigCommands::Template => {
            output::block(&Settings::template())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_bare_file_name_when_resolving_forest_dir_then_uses_cwd() {
        assert_eq!(forest_dir(Path::new("budget.toml")), Path::new("."));
        assert_eq!(
            forest_dir(Path::new("/tmp/plans/budget.toml")),
            Path::new("/tmp/plans")
        );
    }
}
