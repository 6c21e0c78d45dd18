/// Classification of a command line's leading token (§4.4). Standard verbs
/// are matched case-insensitively; the two loopback admin commands are
/// matched verbatim, by design (§4.6) — they are magic tokens, not user
/// input meant to be typo-tolerant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Set,
    Add,
    Replace,
    Append,
    Prepend,
    Cas,
    Get,
    Gets,
    Delete,
    FlushAll,
    Incr,
    Decr,
    Stats,
    Version,
    Verbosity,
    Quit,
    Bget,
    Bset,
    Bkeys,
    Status,
    Shutdown,
    Unknown,
}

pub const STATUS_CMD: &str = "__/status/__";
pub const SHUTDOWN_CMD: &str = "__/shutdown/__";

pub fn classify(head: &str) -> Command {
    if head == STATUS_CMD {
        return Command::Status;
    }
    if head == SHUTDOWN_CMD {
        return Command::Shutdown;
    }
    match_standard(head)
}

fn match_standard(head: &str) -> Command {
    let lower = head.to_ascii_lowercase();
    match lower.as_str() {
        "set" => Command::Set,
        "add" => Command::Add,
        "replace" => Command::Replace,
        "append" => Command::Append,
        "prepend" => Command::Prepend,
        "cas" => Command::Cas,
        "get" => Command::Get,
        "gets" => Command::Gets,
        "delete" => Command::Delete,
        "flush_all" => Command::FlushAll,
        "incr" => Command::Incr,
        "decr" => Command::Decr,
        "stats" => Command::Stats,
        "version" => Command::Version,
        "verbosity" => Command::Verbosity,
        "quit" => Command::Quit,
        "bget" => Command::Bget,
        "bset" => Command::Bset,
        "bkeys" => Command::Bkeys,
        _ => Command::Unknown,
    }
}

/// Splits a command line on single ASCII spaces, discarding empty tokens
/// produced by repeated spaces.
pub fn tokenize(line: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(line)
        .split(' ')
        .filter(|tok| !tok.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Strips a trailing literal `noreply` token, reporting whether it was
/// present.
pub fn strip_noreply(tokens: &mut Vec<String>) -> bool {
    if tokens.last().is_some_and(|tok| tok == "noreply") {
        tokens.pop();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_case_insensitively() {
        assert_eq!(classify("SET"), Command::Set);
        assert_eq!(classify("GeT"), Command::Get);
        assert_eq!(classify("bogus"), Command::Unknown);
    }

    #[test]
    fn admin_tokens_are_case_sensitive() {
        assert_eq!(classify("__/STATUS/__"), Command::Unknown);
        assert_eq!(classify(STATUS_CMD), Command::Status);
    }

    #[test]
    fn noreply_is_stripped() {
        let mut tokens = tokenize(b"set key 0 0 5 noreply");
        assert!(strip_noreply(&mut tokens));
        assert_eq!(tokens, vec!["set", "key", "0", "0", "5"]);
    }
}
