//! Extraction of generated keys from a node's startup banner.

const SECTION_HEADER: &str = "Private Keys";

/// Keys listed in the `Private Keys` section, in order.
///
/// Entries look like `(0) 0x<64 hex>`. The section ends at the first line
/// after an entry that is not itself an entry. Output that is still being
/// written may yield a prefix of the final list.
pub fn parse_private_keys(output: &str) -> Vec<String> {
    let mut lines = output.lines().map(str::trim);
    if !lines.any(|l| l.eq_ignore_ascii_case(SECTION_HEADER)) {
        return Vec::new();
    }

    let mut keys = Vec::new();
    for line in lines {
        if line.is_empty() || line.chars().all(|c| c == '=') {
            if keys.is_empty() {
                continue;
            }
            break;
        }
        match parse_entry(line, keys.len()) {
            Some(key) => keys.push(key.to_owned()),
            None => break,
        }
    }
    keys
}

/// Parses `(idx) 0x<hex>` when `idx` is the expected position.
fn parse_entry(line: &str, expected: usize) -> Option<&str> {
    let rest = line.strip_prefix('(')?;
    let (idx, rest) = rest.split_once(')')?;
    if idx.trim().parse::<usize>().ok()? != expected {
        return None;
    }
    let key = rest.split_whitespace().next()?;
    let digits = key.strip_prefix("0x")?;
    (digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit())).then_some(key)
}
