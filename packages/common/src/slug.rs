use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Slug used when no name field yields any usable character.
pub const FALLBACK_SLUG: &str = "client";

/// Turn free text into a URL-safe slug.
///
/// Accents are stripped through NFD decomposition and the result is lowercased. Word characters
/// (`[a-z0-9_]`) are kept, runs of whitespace and hyphens become a single `-`, and everything
/// else is dropped. Leading and trailing separators are removed, so the result may be empty.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.nfd().filter(|c| !is_combining_mark(*c)) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug
}

/// Build the base slug for a client from its best available name.
///
/// `first_name surname` wins when either is set, then `nickname`, then [`FALLBACK_SLUG`].
/// A purely numeric result is prefixed with `client-`, since a numeric path segment always
/// resolves as an id.
pub fn client_base_slug(
    first_name: Option<&str>,
    surname: Option<&str>,
    nickname: Option<&str>,
) -> String {
    let full_name = [first_name, surname]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    [Some(full_name.as_str()), nickname]
        .into_iter()
        .flatten()
        .map(slugify)
        .find(|s| !s.is_empty())
        .map(|s| {
            if s.chars().all(|c| c.is_ascii_digit()) {
                format!("{FALLBACK_SLUG}-{s}")
            } else {
                s
            }
        })
        .unwrap_or_else(|| FALLBACK_SLUG.to_string())
}

/// Pick the first slug in `base`, `base-2`, `base-3`, ... for which `is_taken` is false.
pub fn next_free_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Slug given to a soft-deleted client so its original slug can be reused.
pub fn deleted_slug(slug: &str, id: i32) -> String {
    format!("{slug}_deleted_{id}")
}

/// Whether `slug` could have been produced by [`next_free_slug`] for `base`.
pub fn is_slug_variant(slug: &str, base: &str) -> bool {
    match slug.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit())),
        None => false,
    }
}
