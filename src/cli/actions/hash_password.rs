use crate::gate::hash_password;
use anyhow::{anyhow, Context, Result};
use std::io::{self, BufRead, Write};

/// Read one password line from stdin and print its PHC hash.
/// # Errors
/// Returns an error if stdin is empty or hashing fails.
pub fn execute() -> Result<()> {
    let stdin = io::stdin();
    let password = read_password(stdin.lock())?;

    let hash = hash_password(&password)?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{hash}").context("failed to write hash")?;
    Ok(())
}

fn read_password(mut input: impl BufRead) -> Result<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(anyhow!("empty password"));
    }
    Ok(password.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_password_strips_line_ending() {
        let password = read_password("demo123\r\n".as_bytes()).unwrap();
        assert_eq!(password, "demo123");
    }

    #[test]
    fn read_password_keeps_inner_whitespace() {
        let password = read_password(" two words \n".as_bytes()).unwrap();
        assert_eq!(password, " two words ");
    }

    #[test]
    fn read_password_rejects_empty_input() {
        assert!(read_password("".as_bytes()).is_err());
        assert!(read_password("\n".as_bytes()).is_err());
    }
}
