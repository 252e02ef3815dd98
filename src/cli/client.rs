//! Client subcommands.
//!
//! Each command drives a [`TaskListView`] against a running service, the same
//! way the web page does: load the list, apply one mutation, print the result.

use crate::client::{Confirm, TaskApi, TaskListView};
use crate::format::{OutputFormat, format_task, format_tasks};
use crate::types::Task;
use anyhow::{Context, Result};
use clap::Args;
use std::io::{BufRead, Write};

/// Arguments for the list subcommand
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the add subcommand
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Task title; multiple words are joined with spaces
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl AddArgs {
    pub fn title(&self) -> String {
        self.words.join(" ")
    }
}

/// Arguments for the toggle subcommand
#[derive(Args, Debug)]
pub struct ToggleArgs {
    /// Task id
    pub id: i64,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the delete subcommand
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Task id
    pub id: i64,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Asks on a terminal before deleting.
pub struct PromptConfirm<R, W> {
    input: std::sync::Mutex<R>,
    output: std::sync::Mutex<W>,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: std::sync::Mutex::new(input),
            output: std::sync::Mutex::new(output),
        }
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&self, task: &Task) -> bool {
        let (Ok(mut input), Ok(mut output)) = (self.input.lock(), self.output.lock()) else {
            return false;
        };
        let prompt = write!(
            output,
            "Delete \"{}\"? Are you sure you want to delete this task? [y/N] ",
            task.title
        )
        .and_then(|()| output.flush());
        if prompt.is_err() {
            return false;
        }

        let mut answer = String::new();
        if input.read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Print the task list.
pub async fn run_list<A: TaskApi>(
    view: &TaskListView<A>,
    args: &ListArgs,
    out: &mut impl Write,
) -> Result<()> {
    view.load().await?;
    write!(
        out,
        "{}",
        format_tasks(&view.tasks(), &view.summary(), args.format)
    )
    .context("failed to write task list")?;
    Ok(())
}

/// Create a task and print it. The title is validated like the server does,
/// so an overlong title is refused rather than shortened.
pub async fn run_add<A: TaskApi>(
    view: &TaskListView<A>,
    args: &AddArgs,
    out: &mut impl Write,
) -> Result<Task> {
    view.set_draft(args.title());
    let task = view.submit().await?;
    write!(out, "{}", format_task(&task, args.format)).context("failed to write task")?;
    Ok(task)
}

/// Flip a task and print its new state.
pub async fn run_toggle<A: TaskApi>(
    view: &TaskListView<A>,
    args: &ToggleArgs,
    out: &mut impl Write,
) -> Result<Task> {
    view.load().await?;
    let task = view.toggle(args.id).await?;
    write!(out, "{}", format_task(&task, args.format)).context("failed to write task")?;
    Ok(task)
}

/// Delete a task after confirmation.
pub async fn run_delete<A: TaskApi>(
    view: &TaskListView<A>,
    args: &DeleteArgs,
    confirm: &dyn Confirm,
    out: &mut impl Write,
) -> Result<()> {
    view.load().await?;
    view.delete(args.id, confirm).await?;
    writeln!(out, "Task deleted successfully").context("failed to write result")?;
    Ok(())
}
