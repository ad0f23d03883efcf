use std::io::{self, BufRead, Write};

use subtrack_core::Resolution;

/// Decides what happens to a term the vocabulary rejected. The gate logic
/// never touches the terminal; this seam is what session tests script.
pub trait Prompt {
    fn resolve(&mut self, term: &str, suggestions: &[String]) -> Resolution;
}

/// One-shot interactive prompter used by the real REPL.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn resolve(&mut self, term: &str, suggestions: &[String]) -> Resolution {
        println!("The term '{term}' is not in the vocabulary. Closest existing terms:");
        for (index, suggestion) in suggestions.iter().enumerate() {
            println!("   {}. {}", index + 1, suggestion);
        }
        print!("Enter f to force the term, s to skip it, or a number to use a suggestion: ");
        if io::stdout().flush().is_err() {
            return Resolution::Skip;
        }
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => parse_choice(line.trim(), suggestions.len()),
            Err(_) => Resolution::Skip,
        }
    }
}

pub fn parse_choice(raw: &str, offered: usize) -> Resolution {
    match raw.to_lowercase().as_str() {
        "f" | "force" => Resolution::Force,
        "s" | "skip" => Resolution::Skip,
        other => match other.parse::<usize>() {
            Ok(n) if (1..=offered).contains(&n) => Resolution::Suggestion(n - 1),
            _ => Resolution::Unrecognized,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_map_to_resolutions() {
        assert_eq!(parse_choice("f", 5), Resolution::Force);
        assert_eq!(parse_choice("FORCE", 5), Resolution::Force);
        assert_eq!(parse_choice("s", 5), Resolution::Skip);
        assert_eq!(parse_choice("3", 5), Resolution::Suggestion(2));
        assert_eq!(parse_choice("1", 1), Resolution::Suggestion(0));
    }

    #[test]
    fn out_of_range_or_junk_is_unrecognized() {
        assert_eq!(parse_choice("0", 5), Resolution::Unrecognized);
        assert_eq!(parse_choice("6", 5), Resolution::Unrecognized);
        assert_eq!(parse_choice("maybe", 5), Resolution::Unrecognized);
        assert_eq!(parse_choice("", 5), Resolution::Unrecognized);
    }
}
