use debsrc_import::Prompter;
use dialoguer::Input;
use std::io::{self, IsTerminal};

/// Asks on the terminal through dialoguer.
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// Prompting needs both ends of a terminal.
    pub fn available() -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(
        &self,
        question: &str,
        default: Option<&str>,
        validate: &dyn Fn(&str) -> bool,
        invalid_msg: &str,
    ) -> io::Result<String> {
        let mut input = Input::<String>::new().with_prompt(question);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        let message = invalid_msg.to_string();
        input
            .validate_with(move |value: &String| -> Result<(), String> {
                if validate(value) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            })
            .interact_text()
            .map_err(io::Error::other)
    }
}
