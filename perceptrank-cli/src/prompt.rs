/// Terminal prompts for a single judgment and parsing of the reply.
use perceptrank_core::Outcome;

/// What the person typed at the judgment prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Judged(Outcome),
    /// Drop the pair without a judgment.
    Skip,
    Quit,
}

/// Question shown above a pair for `dimension`.
pub fn build_question(dimension: &str) -> String {
    match dimension {
        "beautiful" => "Which place looks more beautiful?".to_string(),
        "boring" => "Which place looks more boring?".to_string(),
        "depressing" => "Which place looks more depressing?".to_string(),
        "lively" => "Which place looks livelier?".to_string(),
        "safety" => "Which place looks safer?".to_string(),
        "wealthy" => "Which place looks wealthier?".to_string(),
        other => format!("Which image is more {other}?"),
    }
}

pub const ANSWER_HINT: &str = "[l]eft / [r]ight / [e]qual, [s]kip, [q]uit";

/// Parse one line of input. `None` means the input was not understood and
/// the prompt should be repeated.
pub fn parse_answer(input: &str) -> Option<Answer> {
    let trimmed = input.trim().to_ascii_lowercase();
    match trimmed.as_str() {
        "s" | "skip" => Some(Answer::Skip),
        "q" | "quit" | "exit" => Some(Answer::Quit),
        "" => None,
        other => other.parse::<Outcome>().ok().map(Answer::Judged),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_question() {
        assert_eq!(build_question("safety"), "Which place looks safer?");
        assert_eq!(build_question("green"), "Which image is more green?");
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("l\n"), Some(Answer::Judged(Outcome::Left)));
        assert_eq!(parse_answer(" RIGHT "), Some(Answer::Judged(Outcome::Right)));
        assert_eq!(parse_answer("e"), Some(Answer::Judged(Outcome::Tie)));
        assert_eq!(parse_answer("equal"), Some(Answer::Judged(Outcome::Tie)));
        assert_eq!(parse_answer("s"), Some(Answer::Skip));
        assert_eq!(parse_answer("q"), Some(Answer::Quit));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
