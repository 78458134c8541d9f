// Copyright (c) 2026 Element Creations Ltd
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Languages offered by the code block picker. Other class-safe identifiers
/// are still accepted on a code block, they just aren't listed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum CodeLanguage {
    Plaintext,
    Bash,
    C,
    Cpp,
    Csharp,
    Css,
    Go,
    Html,
    Java,
    Javascript,
    Json,
    Kotlin,
    Markdown,
    Php,
    Python,
    Ruby,
    Rust,
    Sql,
    Swift,
    Typescript,
    Yaml,
}

/// Whether `language` can be embedded in a `language-*` class name.
pub fn is_class_safe(language: &str) -> bool {
    !language.is_empty()
        && language.len() <= 32
        && language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#'))
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_listed_language_is_class_safe() {
        assert!(CodeLanguage::iter().all(|l| is_class_safe(l.as_ref())));
    }

    #[test]
    fn class_safety_rejects_markup() {
        assert!(is_class_safe("objective-c"));
        assert!(!is_class_safe("x\" onclick=\"y"));
        assert!(!is_class_safe(""));
    }
}
