use std::sync::LazyLock;

use regex::Regex;

/// Everything outside ASCII alphanumerics. Used for collection names.
static STRICT: LazyLock<Regex> =
	LazyLock::new(|| Regex::new("[^A-Za-z0-9]+").expect("strict sanitize pattern must compile"));

/// Everything outside ASCII alphanumerics and the accented vowels kept in words.
static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new("[^A-Za-z0-9éèàìòùÉÈÀÌÒÙ]+").expect("loose sanitize pattern must compile")
});

/// Normalizes a raw token before it enters the model.
///
/// Strips every disallowed character, trims leading/trailing hyphens and
/// lowercases the remainder.
///
/// - `strict = true` keeps ASCII alphanumerics only, for names that become
///   collection identifiers.
/// - `strict = false` also keeps `é è à ì ò ù` (either case), for ordinary words.
///
/// The result may be empty (e.g. a token made only of punctuation).
pub fn sanitize(token: &str, strict: bool) -> String {
	let pattern = if strict { &*STRICT } else { &*LOOSE };
	pattern.replace_all(token, "").trim_matches('-').to_lowercase()
}
