//! Code block extraction and display formatting.
//!
//! The model is asked to wrap code it wants executed in a run fence:
//!
//! ```text
//! Thought: ...
//! ```<RUN>
//! print(1 + 1)
//! ```<END_CODE>
//! ```
//!
//! and code it only wants to show the user in a display fence
//! (```` ```<DISPLAY:python> ... ```<END_DISPLAY_CODE> ````).
//! [`extract_code`] pulls runnable code out of a response;
//! [`reformat_for_display`] turns display fences into plain Markdown fences
//! for final answers.

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::syntax::is_valid_script;

/// Marker that opens a block of code to execute.
pub const RUN_MARKER: &str = "```<RUN>";
/// Marker that closes a block of code to execute; also used as a stop sequence.
pub const END_CODE: &str = "<END_CODE>";
/// Marker that closes a display-only block.
pub const END_DISPLAY_CODE: &str = "<END_DISPLAY_CODE>";

static RUN_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```<RUN>(.*?)```(?:<END_CODE>)?").expect("Invalid run block regex")
});

static PYTHON_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").expect("Invalid python block regex")
});

static DISPLAY_OPEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```<DISPLAY:([A-Za-z0-9_+#.\-]*)>").expect("Invalid display fence regex")
});

/// A closing marker glued to a fence, possibly after doubled backticks.
static CLOSING_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:```)*<END_(?:DISPLAY_)?CODE>").expect("Invalid closing marker regex")
});

/// An end-of-display marker that lost its backticks, alone at the start of a line.
static BARE_DISPLAY_END_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^<END_DISPLAY_CODE>").expect("Invalid bare display end regex")
});

/// A fence line made of two or more fences.
static DOUBLED_FENCE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^```(?:```)+[ \t]*$").expect("Invalid doubled fence regex")
});

/// A marker cut short by the end of the text, right after a fence.
static TRAILING_PARTIAL_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:<END[A-Z_]*)+$").expect("Invalid partial marker regex")
});

/// No executable code block was found in a model response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Your code snippet is invalid, because no ```<RUN> or ```python block was found in it.\n\
     Here is your code snippet:\n{text}\n\
     Make sure to include code with the correct pattern, for instance:\n\
     Thoughts: Your thoughts\n\
     Code:\n\
     ```<RUN>\n\
     # Your python code here\n\
     ```<END_CODE>"
)]
pub struct ParseError {
    /// The model output that could not be parsed.
    pub text: String,
}

/// Extract the code to execute from a model response.
///
/// Run-fenced blocks win over `python`/`py` fences; all blocks of the winning
/// kind are joined with a blank line. Unfenced text is accepted as-is when it
/// looks like a standalone script.
pub fn extract_code(text: &str) -> Result<String, ParseError> {
    for regex in [&*RUN_BLOCK_REGEX, &*PYTHON_BLOCK_REGEX] {
        let blocks: Vec<&str> = regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .collect();
        if !blocks.is_empty() {
            return Ok(blocks.join("\n\n"));
        }
    }

    if is_valid_script(text) {
        return Ok(text.to_string());
    }

    Err(ParseError {
        text: text.to_string(),
    })
}

/// Rewrite display fences into plain Markdown fences.
///
/// Display openers become language fences; closing markers that lost or
/// doubled their backticks become plain closing fences. Rewrites repeat
/// until nothing changes, and each one shortens the text.
pub fn reformat_for_display(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = display_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One rewrite round. Every rewrite is anchored to a fence, so text outside
/// fences is never touched.
fn display_pass(text: &str) -> String {
    let text = DISPLAY_OPEN_REGEX.replace_all(text, "```$1");
    let text = CLOSING_MARKER_REGEX.replace_all(&text, "```");
    let text = BARE_DISPLAY_END_REGEX.replace_all(&text, "```");
    let text = DOUBLED_FENCE_LINE_REGEX.replace_all(&text, "```");
    TRAILING_PARTIAL_MARKER_REGEX
        .replace(&text, "```")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_run_block() {
        let text = "Thought: do X\n```<RUN>\nprint(1+1)\n```<END_CODE>";
        assert_eq!(extract_code(text).unwrap(), "print(1+1)");
    }

    #[test]
    fn run_block_without_end_marker() {
        let text = "Thought: stop sequence ate the marker\n```<RUN>\nx = 2\nprint(x)\n```";
        assert_eq!(extract_code(text).unwrap(), "x = 2\nprint(x)");
    }

    #[test]
    fn multiple_run_blocks_are_joined() {
        let text = "```<RUN>\na = 1\n```<END_CODE>\nthen\n```<RUN>\nprint(a)\n```<END_CODE>";
        assert_eq!(extract_code(text).unwrap(), "a = 1\n\nprint(a)");
    }

    #[test]
    fn run_marker_takes_precedence_over_python_fence() {
        let text = "```python\nignored()\n```\n```<RUN>\nused()\n```<END_CODE>";
        assert_eq!(extract_code(text).unwrap(), "used()");
    }

    #[test]
    fn python_fences_are_the_fallback() {
        let text = "Thought: classic fence\n```py\nprint('a')\n```\nand\n```python\nprint('b')\n```";
        assert_eq!(extract_code(text).unwrap(), "print('a')\n\nprint('b')");
    }

    #[test]
    fn bare_script_returned_verbatim() {
        let text = "import math\nprint(math.pi)\n";
        assert_eq!(extract_code(text).unwrap(), text);
    }

    #[test]
    fn prose_fails_with_guidance() {
        let err = extract_code("I cannot help with that.").unwrap_err();
        assert_eq!(err.text, "I cannot help with that.");
        let message = err.to_string();
        assert!(message.contains("I cannot help with that."));
        assert!(message.contains("```<RUN>"));
        assert!(message.contains("```<END_CODE>"));
    }

    #[test]
    fn display_fence_becomes_markdown() {
        let text = "Here you go:\n```<DISPLAY:python>\nprint(1)\n```<END_DISPLAY_CODE>\nDone.";
        assert_eq!(
            reformat_for_display(text),
            "Here you go:\n```python\nprint(1)\n```\nDone."
        );
    }

    #[test]
    fn mangled_end_markers_are_restored() {
        assert_eq!(
            reformat_for_display("```<DISPLAY:rust>\nfn main() {}\n<END_DISPLAY_CODE>"),
            "```rust\nfn main() {}\n```"
        );
        assert_eq!(
            reformat_for_display("```<DISPLAY:sh>\nls\n``````"),
            "```sh\nls\n```"
        );
        assert_eq!(
            reformat_for_display("```<DISPLAY:sql>\nselect 1\n```<END_CODE>"),
            "```sql\nselect 1\n```"
        );
    }

    #[test]
    fn trailing_partial_marker_is_stripped() {
        assert_eq!(
            reformat_for_display("```<DISPLAY:py>\nx\n```<END_DISP"),
            "```py\nx\n```"
        );
    }

    #[test]
    fn plain_text_is_untouched() {
        let text = "The answer is 42.\n\n```python\nprint(42)\n```\n<b>bold</b>";
        assert_eq!(reformat_for_display(text), text);
    }

    #[test]
    fn markers_in_prose_are_left_alone() {
        for text in [
            "Type <END_CODE> when you are done.",
            "Six backticks `````` inside a sentence stay.",
            "Markers look like <END_DISPLAY_CODE> in the docs.",
            "This sentence ends with <END",
            "```python\nx = 1\n```\nthen <END_CODE> in prose",
        ] {
            assert_eq!(reformat_for_display(text), text);
        }
    }

    #[test]
    fn markdown_answer_is_not_code() {
        for text in ["Answer:\n- Paris", "Results:\n- Tokyo\n- Paris", "if x"] {
            let err = extract_code(text).unwrap_err();
            assert_eq!(err.text, text);
        }
    }

    #[test]
    fn display_reformat_is_idempotent() {
        let samples = [
            "",
            "plain",
            "```<DISPLAY:python>\na\n```<END_DISPLAY_CODE>",
            "```<END_CODE><DISPLAY:py>",
            "`````````",
            "```<DISPLAY:```<DISPLAY:go>>",
            "x <END<END",
            "```<DISPLAY:c>\nint x;\n<END_DISPLAY_CODE><END_CODE>",
        ];
        for sample in samples {
            let once = reformat_for_display(sample);
            assert_eq!(reformat_for_display(&once), once, "sample: {sample:?}");
        }
    }
}
