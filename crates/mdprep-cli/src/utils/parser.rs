use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid assignment '{0}'. Expected KEY=VALUE (e.g., 'nsteps=500000').")]
    MissingSeparator(String),

    #[error("Key cannot be empty in assignment '{0}'.")]
    EmptyKey(String),
}

/// Splits `KEY=VALUE` on the first `=`, trimming both sides. The value may be
/// empty or contain further `=` characters.
pub fn parse_assignment(text: &str) -> Result<(&str, &str), ParseError> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| ParseError::MissingSeparator(text.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ParseError::EmptyKey(text.to_string()));
    }
    Ok((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_separator() {
        assert_eq!(parse_assignment("nsteps=100"), Ok(("nsteps", "100")));
        assert_eq!(parse_assignment(" define = -DPOSRES "), Ok(("define", "-DPOSRES")));
        assert_eq!(parse_assignment("a=b=c"), Ok(("a", "b=c")));
        assert_eq!(parse_assignment("define="), Ok(("define", "")));
    }

    #[test]
    fn rejects_malformed_assignments() {
        assert_eq!(
            parse_assignment("nsteps"),
            Err(ParseError::MissingSeparator("nsteps".to_string()))
        );
        assert_eq!(
            parse_assignment(" =1"),
            Err(ParseError::EmptyKey(" =1".to_string()))
        );
    }
}
