//! Terminal renderer: prints the authenticator list and turns typed choices into
//! login requests.

use std::io::{self, BufRead, Write};
use std::thread;

use tracing::{debug, warn};

use ual_session_core::{LoginSelector, RendererContext, UiRenderer};

pub struct ConsoleRenderer {
    /// Handed to the input thread on first render; the channel closes when stdin does
    selector: Option<LoginSelector>,
    names: Vec<String>,
    container: String,
    plain: bool,
}

impl ConsoleRenderer {
    pub fn new(ctx: RendererContext) -> Self {
        Self {
            selector: Some(ctx.selector),
            names: ctx
                .authenticators
                .iter()
                .map(|a| a.name().to_string())
                .collect(),
            container: ctx.container_element,
            plain: ctx.button_style_override,
        }
    }

    fn print_menu(&self) -> io::Result<()> {
        let mut err = io::stderr().lock();
        if self.plain {
            writeln!(err, "Authenticators:")?;
        } else {
            writeln!(err, "=== Login ({}) ===", self.container)?;
        }
        for (i, name) in self.names.iter().enumerate() {
            writeln!(err, "  {}) {}", i + 1, name)?;
        }
        writeln!(err, "Choose <number> [account]:")?;
        err.flush()
    }

    /// Read choices from stdin until the coordinator stops listening.
    ///
    /// Runs on a plain thread: a blocking stdin read must not hold up runtime shutdown.
    fn listen(&self, selector: LoginSelector) -> io::Result<()> {
        let names = self.names.clone();
        thread::Builder::new()
            .name("ual-console-input".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            warn!(error = %e, "Failed to read selection");
                            break;
                        }
                    };
                    match parse_choice(&line, &names) {
                        Ok((name, account)) => {
                            if selector.select_blocking(name, account).is_err() {
                                debug!("Coordinator no longer accepting selections");
                                break;
                            }
                        }
                        Err(message) => eprintln!("{}", message),
                    }
                }
            })?;
        Ok(())
    }
}

impl UiRenderer for ConsoleRenderer {
    fn generate_ui(&mut self) -> io::Result<()> {
        self.print_menu()?;
        if let Some(selector) = self.selector.take() {
            self.listen(selector)?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        if let Err(e) = self.print_menu() {
            debug!(error = %e, "Failed to reprint authenticator menu");
        }
    }
}

/// Parse `<number> [account]` against the listed authenticator names
pub fn parse_choice<'a>(line: &'a str, names: &'a [String]) -> Result<(&'a str, Option<&'a str>), String> {
    let mut parts = line.split_whitespace();
    let choice = parts.next().ok_or_else(|| "Enter a number".to_string())?;
    let index: usize = choice
        .parse()
        .map_err(|_| format!("Not a number: {}", choice))?;
    let name = index
        .checked_sub(1)
        .and_then(|i| names.get(i))
        .ok_or_else(|| format!("No authenticator {}", index))?;
    Ok((name.as_str(), parts.next()))
}
