use crate::{Error, Result, Word};

const DELIMITER: char = ',';

/// Turn program text like `"1,0,0,0,99"` into the words it stands for.
///
/// Whitespace around the whole text and around each item is ignored, so a
/// trailing newline from a file is fine. Empty text is an empty program.
pub fn parse_program(text: &str) -> Result<Vec<Word>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(DELIMITER)
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<Word>().map_err(|_| Error::Parse {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// The inverse of [`parse_program`].
pub fn format_program(program: &[Word]) -> String {
    program
        .iter()
        .map(|word| word.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
