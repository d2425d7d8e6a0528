//! Dotted structural paths such as `Ots.Network.Node`.

/// Appends `name` to `path`, leaving out the dot for an empty path.
pub fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Everything before the last dot, or `""`.
pub fn parent(path: &str) -> &str {
    path.rfind('.').map_or("", |dot| &path[..dot])
}

/// Everything after the last dot.
pub fn last(path: &str) -> &str {
    path.rfind('.').map_or(path, |dot| &path[dot + 1..])
}

/// Detects recursion by checking whether the path ends in a repeated
/// suffix, e.g. `A.B.C.B.C`.
///
/// The path is reversed and for each dot the part up to and including it is
/// compared with the equally long part right after it. This is a structural
/// heuristic, not a cycle detector: `A.B.B` counts as recursion while a cycle
/// with a period that does not line up with the end of the path is only found
/// once it does.
pub fn is_recursive(path: &str) -> bool {
    let reversed: Vec<char> = path.chars().rev().collect();
    let mut from = 0;
    while from < reversed.len() {
        let Some(dot) = reversed[from..].iter().position(|c| *c == '.').map(|i| i + from) else {
            return false;
        };
        let to = 2 * (dot + 1);
        if to > reversed.len() {
            return false;
        }
        if reversed[..=dot] == reversed[dot + 1..to] {
            return true;
        }
        from = dot + 1;
    }
    false
}
