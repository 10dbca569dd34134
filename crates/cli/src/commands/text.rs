//! `codeloop parse` and `codeloop display`: run the code block parser on a
//! model response.

use codeloop_agent::{extract_code, reformat_for_display};
use std::io::Read;

/// Read a whole file, or stdin when `input` is `-`.
fn read_input(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(input).map_err(|e| format!("Failed to read {input}: {e}").into())
}

pub async fn parse(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    tracing::debug!(input, chars = text.len(), "Parsing model response");
    match extract_code(&text) {
        Ok(code) => {
            println!("{code}");
            Ok(())
        }
        Err(e) => {
            eprintln!("{e}");
            Err("No executable code found".into())
        }
    }
}

pub async fn display(input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let text = read_input(input)?;
    println!("{}", reformat_for_display(&text));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_file_input() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "```<RUN>\nprint(1)\n```<END_CODE>").unwrap();
        let text = read_input(file.path().to_str().unwrap()).unwrap();
        assert_eq!(extract_code(&text).unwrap(), "print(1)");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_input("/nonexistent/response.txt").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/response.txt"));
    }

    #[tokio::test]
    async fn parse_fails_on_prose() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "I cannot help with that.").unwrap();
        assert!(parse(file.path().to_str().unwrap()).await.is_err());
    }
}
