//! Numbered-list pack picker on the terminal.

use std::io::{self, BufRead, Write};

use colored::Colorize;

use treeline_core::PackId;
use treeline_export::{Choice, ExportError, PackSelector};

/// Prints choices to stderr and reads the answer from stdin.
pub struct TerminalSelector;

impl PackSelector for TerminalSelector {
    fn select(&self, choices: &[Choice], message: &str) -> Result<PackId, ExportError> {
        let stdin = io::stdin();
        let stderr = io::stderr();
        select_from(&mut stdin.lock(), &mut stderr.lock(), choices, message)
    }
}

/// Ask until the answer names a choice, by number or by id.
///
/// End of input aborts the selection.
pub fn select_from(
    input: &mut impl BufRead,
    output: &mut impl Write,
    choices: &[Choice],
    message: &str,
) -> Result<PackId, ExportError> {
    let prompt_err = |e: io::Error| ExportError::Prompt(e.to_string());

    writeln!(output, "{}", message.bold()).map_err(prompt_err)?;
    for (index, choice) in choices.iter().enumerate() {
        writeln!(
            output,
            "  {:>2}) {} {}",
            index + 1,
            choice.label,
            format!("({})", choice.id).bright_black()
        )
        .map_err(prompt_err)?;
    }

    loop {
        write!(output, "Enter a number [1-{}]: ", choices.len()).map_err(prompt_err)?;
        output.flush().map_err(prompt_err)?;

        let mut line = String::new();
        if input.read_line(&mut line).map_err(prompt_err)? == 0 {
            return Err(ExportError::Prompt("no selection made".into()));
        }
        match parse_answer(line.trim(), choices) {
            Some(id) => return Ok(id),
            None => writeln!(output, "{}", "Not one of the listed packs.".yellow())
                .map_err(prompt_err)?,
        }
    }
}

fn parse_answer(answer: &str, choices: &[Choice]) -> Option<PackId> {
    if answer.is_empty() {
        return None;
    }
    if let Ok(number) = answer.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| choices.get(index))
            .map(|choice| choice.id.clone());
    }
    choices
        .iter()
        .find(|choice| choice.id.0 == answer)
        .map(|choice| choice.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn choices() -> Vec<Choice> {
        vec![
            Choice {
                id: PackId::from("machinepack-math"),
                label: "Math".into(),
            },
            Choice {
                id: PackId::from("machinepack-strings"),
                label: "Strings".into(),
            },
        ]
    }

    #[test]
    fn picks_by_number_after_bad_answers() {
        let mut input = Cursor::new("\n0\nnope\n2\n");
        let mut output = Vec::new();
        let picked = select_from(&mut input, &mut output, &choices(), "Pick one").unwrap();
        assert_eq!(picked, PackId::from("machinepack-strings"));

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("1) Math"));
        assert_eq!(shown.matches("Not one of the listed packs.").count(), 3);
    }

    #[test]
    fn picks_by_id() {
        let mut input = Cursor::new("machinepack-math\n");
        let picked = select_from(&mut input, &mut Vec::new(), &choices(), "Pick").unwrap();
        assert_eq!(picked, PackId::from("machinepack-math"));
    }

    #[test]
    fn end_of_input_aborts() {
        let mut input = Cursor::new("");
        let err = select_from(&mut input, &mut Vec::new(), &choices(), "Pick").unwrap_err();
        assert!(matches!(err, ExportError::Prompt(_)));
    }
}
