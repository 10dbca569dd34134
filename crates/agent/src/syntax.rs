//! Whether unfenced model output is a complete Python script.
//!
//! The text is run through a full Python parser. Prose that happens to
//! tokenize (Markdown bullets, `Answer: ...` lines, half-finished
//! expressions) fails to parse and is left for the caller to treat as a
//! direct answer.

use rustpython_parser::{Parse, ast};
use tracing::debug;

/// Returns `true` when `text` parses as a standalone Python module.
pub fn is_valid_script(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    match ast::Suite::parse(text, "<llm>") {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "Unfenced output is not a script");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_code() {
        assert!(is_valid_script("print(1+1)"));
        assert!(is_valid_script(
            "import math\nresult = math.sqrt(16)\nfinal_answer(result)"
        ));
        assert!(is_valid_script(
            "def f(x):\n    return x if x > 0 else -x\n\nprint(f(-3))"
        ));
    }

    #[test]
    fn accepts_strings_comments_and_continuations() {
        assert!(is_valid_script("s = 'it''s'  # implicit concat\nprint(s)"));
        assert!(is_valid_script("doc = \"\"\"multi\nline\"\"\"\nprint(doc)"));
        assert!(is_valid_script("x = 1 + \\\n    2"));
        assert!(is_valid_script("path = r\"C:\\temp\"\nname = f'{path}!'"));
        assert!(is_valid_script("values = [\n    1,\n    2,\n]"));
        assert!(is_valid_script("x = 1.5e-3\ny = 0xff\nz = ..."));
        assert!(is_valid_script("from . import sibling"));
    }

    #[test]
    fn accepts_compound_statements() {
        assert!(is_valid_script("if a is not None and b not in c:\n    pass"));
        assert!(is_valid_script("for i in range(3):\n    print(i)"));
        assert!(is_valid_script("x: int = 3\nprint(x)"));
        assert!(is_valid_script(
            "try:\n    risky()\nexcept ValueError as e:\n    print(e)\nfinally:\n    done()"
        ));
    }

    #[test]
    fn rejects_prose() {
        assert!(!is_valid_script("I cannot help with that."));
        assert!(!is_valid_script("Thought: I will compute the answer"));
        assert!(!is_valid_script("The answer is 42"));
        assert!(!is_valid_script("It can't be done"));
    }

    #[test]
    fn rejects_markdown_answers() {
        assert!(!is_valid_script("Answer:\n- Paris"));
        assert!(!is_valid_script("Results:\n- Tokyo\n- Paris"));
        assert!(!is_valid_script("Sure, here: 1, 2"));
    }

    #[test]
    fn rejects_broken_structure() {
        assert!(!is_valid_script("print((1 + 2)"));
        assert!(!is_valid_script("print(1 + 2))"));
        assert!(!is_valid_script("x = [1, 2)"));
        assert!(!is_valid_script("s = 'unterminated"));
        assert!(!is_valid_script("value = obj."));
        assert!(!is_valid_script("cost = $5"));
        assert!(!is_valid_script("   \n  "));
        assert!(!is_valid_script("x = = 1"));
        assert!(!is_valid_script("if x"));
        assert!(!is_valid_script("print(1 +)"));
        assert!(!is_valid_script("    x = 1"));
        assert!(!is_valid_script("for i in range(3):\nprint(i)"));
    }
}
