//! Wire format of the PDS shell protocol.
//!
//! Outbound commands are `VERB[ -key value]*[ -?]\r`. Responses are tokenized
//! once into a verb, single-letter options and positional arguments; option
//! values may be attached (`-i3`) or separated (`-i 3`).

use crate::framer::DELIMITER;

/// Line the device prints when its shell is ready for input
pub const PROMPT_BANNER: &str = "ShellApp waiting for input";

/// TCP port of the device shell
pub const DEFAULT_PORT: u16 = 3000;

/// Outbound command: a verb plus ordered single-letter options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    options: Vec<(String, String)>,
    query: bool,
}

impl Command {
    /// Create a new command with the given verb
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            options: Vec::new(),
            query: false,
        }
    }

    /// Create a query (`VERB -?`) asking the device for the current value
    pub fn query(verb: impl Into<String>) -> Self {
        Self {
            query: true,
            ..Self::new(verb)
        }
    }

    /// Set an option, replacing an earlier value for the same key in place
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.options.push((key, value)),
        }
        self
    }

    /// Build a command from any ordered key/value sequence
    pub fn from_options<K, V>(verb: impl Into<String>, options: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        options
            .into_iter()
            .fold(Self::new(verb), |cmd, (k, v)| cmd.with_option(k, v))
    }

    /// Get the command verb
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Get the value of an option
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is a `-?` query
    pub fn is_query(&self) -> bool {
        self.query
    }

    /// Encode to the exact wire string, including the trailing `\r`
    pub fn encode(&self) -> String {
        let mut wire = encode_options(&self.verb, &self.options);
        if self.query {
            wire.push_str(" -?");
        }
        wire.push(DELIMITER as char);
        wire
    }
}

/// Encode a verb and ordered options into a wire string.
///
/// Options with an empty value are omitted. Values are inserted verbatim.
pub fn encode_command<K, V>(verb: &str, options: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut wire = encode_options(verb, options);
    wire.push(DELIMITER as char);
    wire
}

fn encode_options<K, V>(verb: &str, options: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut wire = verb.to_string();
    for (key, value) in options {
        let value = value.as_ref();
        if value.is_empty() {
            continue;
        }
        wire.push_str(" -");
        wire.push_str(key.as_ref());
        wire.push(' ');
        wire.push_str(value);
    }
    wire
}

/// Concatenate several commands into one write
pub fn encode_batch(commands: &[Command]) -> String {
    commands.iter().map(Command::encode).collect()
}

/// Queries for the current preview, program and logo selections
pub fn status_queries() -> Vec<Command> {
    vec![
        Command::query("PREVIEW"),
        Command::query("PROGRAM"),
        Command::query("LOGOSEL"),
    ]
}

/// One response line split into verb, options and positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine<'a> {
    pub verb: &'a str,
    pub options: Vec<(char, Option<&'a str>)>,
    pub args: Vec<&'a str>,
}

impl<'a> ResponseLine<'a> {
    /// Tokenize a line. Returns `None` for blank lines.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut tokens = line.split_whitespace().peekable();
        let verb = tokens.next()?;

        let mut options = Vec::new();
        let mut args = Vec::new();
        while let Some(token) = tokens.next() {
            if !is_option_token(token) {
                args.push(token);
                continue;
            }

            let mut chars = token[1..].chars();
            let Some(key) = chars.next() else { continue };
            let inline = chars.as_str();
            let value = if !inline.is_empty() {
                Some(inline)
            } else if key == '?' {
                None
            } else {
                tokens.next_if(|next| !is_option_token(next))
            };
            options.push((key, value));
        }

        Some(Self { verb, options, args })
    }

    /// Value of the first occurrence of an option
    pub fn option(&self, key: char) -> Option<&'a str> {
        self.options
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| *v)
    }

    /// Option value parsed as an integer
    pub fn option_int(&self, key: char) -> Option<i32> {
        self.option(key).and_then(|v| v.parse().ok())
    }

    /// Negative `-e` code, if present
    ///
    /// Any `-` followed by digits counts; codes beyond `i64` saturate.
    pub fn error_code(&self) -> Option<i64> {
        let digits = self.option('e')?.strip_prefix('-')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let code = format!("-{}", digits).parse().unwrap_or(i64::MIN);
        (code < 0).then_some(code)
    }

    /// Whether the line carries the `-?` query marker
    pub fn is_query(&self) -> bool {
        self.options.iter().any(|(k, _)| *k == '?')
    }
}

/// `-x...` where `x` is a letter or `?`; `-9999` is a value, not a key
fn is_option_token(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some('-')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_skips_empty_options() {
        let wire = encode_command("ISEL", &[("i", "3"), ("f", "")]);
        assert_eq!(wire, "ISEL -i 3\r");
    }

    #[test]
    fn encode_keeps_option_order() {
        let wire = encode_command("OTPT", &[("o", "3"), ("t", "7")]);
        assert_eq!(wire, "OTPT -o 3 -t 7\r");
        let wire = encode_command("OTPT", &[("t", "7"), ("o", "3")]);
        assert_eq!(wire, "OTPT -t 7 -o 3\r");
    }

    #[test]
    fn encode_bare_verb() {
        let options: [(&str, &str); 0] = [];
        assert_eq!(encode_command("TAKE", &options), "TAKE\r");
        assert_eq!(Command::new("TAKE").encode(), "TAKE\r");
    }

    #[test]
    fn encode_is_verbatim() {
        let wire = encode_command("TRNTIME", &[("s", "1.5 -x 2")]);
        assert_eq!(wire, "TRNTIME -s 1.5 -x 2\r");
    }

    #[test]
    fn command_builder() {
        let cmd = Command::new("ISEL").with_option("i", "3").with_option("f", "");
        assert_eq!(cmd.encode(), "ISEL -i 3\r");
        assert_eq!(cmd.option("i"), Some("3"));

        let cmd = cmd.with_option("i", "5");
        assert_eq!(cmd.encode(), "ISEL -i 5\r");
    }

    #[test]
    fn from_options_matches_encode_command() {
        let cmd = Command::from_options("PIPISEL", [("p", "1"), ("i", "7")]);
        assert_eq!(cmd.encode(), encode_command("PIPISEL", &[("p", "1"), ("i", "7")]));
    }

    #[test]
    fn query_encoding() {
        assert_eq!(Command::query("VER").encode(), "VER -?\r");
        let cmd = Command::query("IAVAIL").with_option("i", "7");
        assert_eq!(cmd.encode(), "IAVAIL -i 7 -?\r");
        assert!(cmd.is_query());
    }

    #[test]
    fn status_batch() {
        assert_eq!(
            encode_batch(&status_queries()),
            "PREVIEW -?\rPROGRAM -?\rLOGOSEL -?\r"
        );
    }

    #[test]
    fn parse_attached_and_separated_values() {
        let line = ResponseLine::parse("PREVIEW -i3").unwrap();
        assert_eq!(line.verb, "PREVIEW");
        assert_eq!(line.option('i'), Some("3"));

        let line = ResponseLine::parse("LOGOSEL -l 2").unwrap();
        assert_eq!(line.option_int('l'), Some(2));
    }

    #[test]
    fn parse_negative_value() {
        let line = ResponseLine::parse("ISEL -e -9999").unwrap();
        assert_eq!(line.option('e'), Some("-9999"));
        assert_eq!(line.option_int('e'), Some(-9999));
    }

    #[test]
    fn error_codes() {
        let code = |line: &str| ResponseLine::parse(line).unwrap().error_code();
        assert_eq!(code("TAKE -e -9994"), Some(-9994));
        assert_eq!(code("TAKE -e -99999999999"), Some(-99_999_999_999));
        assert_eq!(code("TAKE -e -99999999999999999999999"), Some(i64::MIN));
        assert_eq!(code("TAKE -e 0"), None);
        assert_eq!(code("TAKE -e -0"), None);
        assert_eq!(code("TAKE -e -12a"), None);
        assert_eq!(code("TAKE"), None);
    }

    #[test]
    fn parse_multiple_options() {
        let line = ResponseLine::parse("IAVAIL -i 7 -m 1").unwrap();
        assert_eq!(line.option_int('i'), Some(7));
        assert_eq!(line.option_int('m'), Some(1));
    }

    #[test]
    fn parse_flag_without_value() {
        let line = ResponseLine::parse("PREVIEW -? -x").unwrap();
        assert!(line.is_query());
        assert_eq!(line.option('x'), None);
        assert_eq!(line.options.len(), 2);
    }

    #[test]
    fn parse_query_does_not_consume_next_token() {
        let line = ResponseLine::parse("VER -? 3.2").unwrap();
        assert!(line.is_query());
        assert_eq!(line.args, vec!["3.2"]);
    }

    #[test]
    fn parse_positional_args() {
        let line = ResponseLine::parse("VER 3.2").unwrap();
        assert_eq!(line.verb, "VER");
        assert_eq!(line.args, vec!["3.2"]);
        assert!(line.options.is_empty());
    }

    #[test]
    fn parse_blank() {
        assert!(ResponseLine::parse("").is_none());
        assert!(ResponseLine::parse("   ").is_none());
    }
}
