//! Reload client injection for served HTML.
//!
//! The fragment is placed before the last `</body>`, falling back to the last
//! `</html>`, falling back to the end of the document. Matching is
//! ASCII case-insensitive and byte-based so malformed or non-UTF-8 documents
//! pass through untouched apart from the insertion.

/// Id of the "reloading" indicator element.
const INDICATOR_ID: &str = "golive-reload-indicator";

/// `sessionStorage` key holding the scroll offset across a reload.
const SCROLL_KEY: &str = "golive:scroll";

/// Insert the reload client into `html`.
///
/// The script connects to `ws://localhost:<port>` and reloads the page when
/// it receives `"reload"`. Injection is a single pass; calling it twice
/// inserts the fragment twice.
pub fn inject(html: &[u8], port: u16) -> Vec<u8> {
    let fragment = reload_fragment(port);

    let position = rfind_ignore_ascii_case(html, b"</body>")
        .or_else(|| rfind_ignore_ascii_case(html, b"</html>"))
        .unwrap_or(html.len());

    let mut output = Vec::with_capacity(html.len() + fragment.len());
    output.extend_from_slice(&html[..position]);
    output.extend_from_slice(fragment.as_bytes());
    output.extend_from_slice(&html[position..]);
    output
}

/// Build the indicator and client script for `port`.
fn reload_fragment(port: u16) -> String {
    format!(
        r#"<div id="{INDICATOR_ID}" style="display:none;position:fixed;right:12px;bottom:12px;z-index:2147483647;padding:6px 12px;border-radius:4px;background:#1f2937;color:#f9fafb;font:13px/1.4 system-ui,sans-serif;opacity:.9">Reloading&hellip;</div>
<script>
(function () {{
  var key = "{SCROLL_KEY}";
  var saved = sessionStorage.getItem(key);
  if (saved !== null) {{
    sessionStorage.removeItem(key);
    var offset = saved.split(",");
    var restore = function () {{ window.scrollTo(Number(offset[0]) || 0, Number(offset[1]) || 0); }};
    if (document.readyState === "complete") restore(); else window.addEventListener("load", restore);
  }}
  var attempts = 0;
  function connect() {{
    var socket = new WebSocket("ws://localhost:{port}");
    socket.onopen = function () {{ attempts = 0; }};
    socket.onmessage = function (event) {{
      if (event.data !== "reload") return;
      sessionStorage.setItem(key, window.scrollX + "," + window.scrollY);
      var indicator = document.getElementById("{INDICATOR_ID}");
      if (indicator) indicator.style.display = "block";
      setTimeout(function () {{ window.location.reload(); }}, 300);
    }};
    socket.onclose = function () {{
      if (attempts >= 5) return;
      var delay = Math.min(1000 * Math.pow(2, attempts), 10000);
      attempts += 1;
      setTimeout(connect, delay);
    }};
  }}
  connect();
}})();
</script>
"#
    )
}

/// Position of the last occurrence of `needle`, ignoring ASCII case.
fn rfind_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window.eq_ignore_ascii_case(needle))
}
