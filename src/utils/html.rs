use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Keeps safe formatting tags (like <b>, <p>) in quiz titles, descriptions,
/// questions and options, and strips <script>, <iframe> and event-handler
/// attributes, including the body of a <script> tag.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
