//! Askama filters shared by the forum templates.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Uppercase first letter of a name, for avatars without a photo.
///
/// Usage in templates: `{{ post.author_name|initial }}`
#[askama::filter_fn]
pub fn initial(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(first_letter(&value.to_string()))
}

fn first_letter(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map_or_else(|| "?".to_string(), |c| c.to_uppercase().collect())
}

/// Year shown in the footer.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Local::now().year())
}

/// Fingerprint of the static stylesheet and script, computed by the build
/// script.
///
/// Usage in templates: `{{ ""|asset_hash }}`
#[askama::filter_fn]
pub fn asset_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("ASSET_HASH"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_letter() {
        assert_eq!(first_letter("ann"), "A");
        assert_eq!(first_letter("  émile"), "É");
        assert_eq!(first_letter(""), "?");
    }
}
