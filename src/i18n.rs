// ==========================================
// Internationalization (i18n)
// ==========================================
// rust-i18n backed; English (fallback) and Russian
// Note: the rust_i18n::i18n! macro is initialized in lib.rs
// ==========================================

/// Current locale
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// Set the locale
///
/// # Arguments
/// - locale: "en" or "ru"
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// Translate a message (no arguments)
///
/// # Example
/// ```no_run
/// use catalog_import::i18n::t;
/// let msg = t("common.success");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// Translate a message with `%{name}` arguments
///
/// # Example
/// ```no_run
/// use catalog_import::i18n::t_with_args;
/// let msg = t_with_args("row.missing_required", &[("row", "2"), ("field", "SKU")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
