// Rack classification from worker names

/// Rack assigned when no naming rule matches.
pub const FALLBACK_RACK: &str = "others";

const LETTER_RACKS: [&str; 6] = ["CH", "B", "C", "D", "E", "F"];
const K_BUCKETS: [&str; 3] = ["01", "02", "03"];
const VENDOR_PREFIX: &str = "Oneminers";

/// Maps a worker name to its rack.
///
/// Rules are tried in order and the first match wins:
/// 1. `C001_` / `C002_` name prefix.
/// 2. `C002_` / `C001_` anywhere in the name, or a vendor tag of the form
///    `Oneminers<digits>_C002`. `C002` is checked before `C001` here.
/// 3. Underscore-delimited prefix: a leading `CH`/`B`/`C`/`D`/`E`/`F`
///    segment, or `K` with bucket `01`/`02`/`03` (yields `K_01` etc).
/// 4. Bare prefix: the name starts with `CH` or one of `B`/`C`/`D`/`E`/`F`.
/// 5. Everything else lands in [`FALLBACK_RACK`].
pub fn classify(worker_name: &str) -> String {
    reserved_prefix(worker_name)
        .or_else(|| reserved_inline(worker_name))
        .or_else(|| delimited_prefix(worker_name))
        .or_else(|| bare_prefix(worker_name))
        .unwrap_or_else(|| FALLBACK_RACK.to_string())
}

fn reserved_prefix(name: &str) -> Option<String> {
    if name.starts_with("C001_") {
        return Some("C001".to_string());
    }
    if name.starts_with("C002_") {
        return Some("C002".to_string());
    }
    None
}

fn reserved_inline(name: &str) -> Option<String> {
    for (tag, rack) in [("C002_", "C002"), ("C001_", "C001")] {
        if name.contains(tag) || vendor_tagged(name, rack) {
            return Some(rack.to_string());
        }
    }
    None
}

/// Matches `Oneminers<digits>_<rack>` at any position in the name.
fn vendor_tagged(name: &str, rack: &str) -> bool {
    name.match_indices(VENDOR_PREFIX).any(|(idx, tag)| {
        let rest = &name[idx + tag.len()..];
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        digits > 0
            && rest[digits..].starts_with('_')
            && rest[digits + 1..].starts_with(rack)
    })
}

fn delimited_prefix(name: &str) -> Option<String> {
    let (head, tail) = name.split_once('_')?;
    if LETTER_RACKS.contains(&head) {
        return Some(head.to_string());
    }
    let bucket = match tail.split_once('_') {
        Some((bucket, _)) => bucket,
        None => tail,
    };
    if head == "K" && K_BUCKETS.contains(&bucket) {
        return Some(format!("K_{bucket}"));
    }
    None
}

fn bare_prefix(name: &str) -> Option<String> {
    LETTER_RACKS
        .iter()
        .find(|rack| name.starts_with(**rack))
        .map(|rack| rack.to_string())
}
