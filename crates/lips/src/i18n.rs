//! Translation delegate
//!
//! The dictionary lives with the embedder; the renderer only asks for the
//! translation of `text` attribute values in the active language.

/// Translation delegate
pub trait Translator {
    /// Translate `text` into `language`, or `None` to keep it as is
    fn translate(&self, text: &str, language: &str) -> Option<String>;
}

impl<F> Translator for F
where
    F: Fn(&str, &str) -> Option<String>,
{
    fn translate(&self, text: &str, language: &str) -> Option<String> {
        self(text, language)
    }
}

/// Translate through an optional delegate, falling back to the input
pub(crate) fn translate(translator: Option<&dyn Translator>, text: &str, language: &str) -> String {
    translator
        .and_then(|t| t.translate(text, language))
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_translator() {
        let fr = |text: &str, lang: &str| (lang == "fr" && text == "Hello").then(|| "Bonjour".to_string());
        assert_eq!(translate(Some(&fr), "Hello", "fr"), "Bonjour");
        assert_eq!(translate(Some(&fr), "Hello", "en"), "Hello");
        assert_eq!(translate(None, "Hello", "fr"), "Hello");
    }
}
