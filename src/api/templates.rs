//! HTML templates for the web client.
//!
//! Templates are embedded at compile time using `include_str!`.

/// The single-page task list client.
pub const INDEX_TEMPLATE: &str = include_str!("templates/index.html");

/// Placeholder in [`INDEX_TEMPLATE`] replaced with the API base URL.
const API_BASE_PLACEHOLDER: &str = "\"{{API_BASE}}\"";

/// Render the client page pointed at the given API base URL.
pub fn render_index(api_base_url: &str) -> String {
    // Emitted as a JSON string literal so it is safe inside <script>
    let literal = serde_json::to_string(api_base_url)
        .unwrap_or_else(|_| "\"/api\"".to_string())
        .replace("</", "<\\/");
    INDEX_TEMPLATE.replace(API_BASE_PLACEHOLDER, &literal)
}
