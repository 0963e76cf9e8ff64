//! Last-used email/URL, remembered across visits.
//!
//! The pair lives in two places: cookies set by the server after a
//! successful capture, and the browser's local storage written live while
//! the form is edited. Both layers go through the same merge policy: a
//! non-empty value from the layer closer to the user overrides the one
//! beneath it (local storage over cookie over configured default).

use url::form_urlencoded;

/// Cookie and local-storage key for the email
pub const EMAIL_KEY: &str = "lastEmail";
/// Cookie and local-storage key for the URL
pub const URL_KEY: &str = "lastUrl";
/// One year
pub const MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub email: String,
    pub url: String,
}

/// A partial layer of remembered values; missing or empty means "no opinion".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceLayer {
    pub email: Option<String>,
    pub url: Option<String>,
}

/// Overlay `layer` onto `base`: each non-empty value in `layer` wins.
pub fn merge(base: &Preferences, layer: &PreferenceLayer) -> Preferences {
    fn pick(base: &str, over: Option<&String>) -> String {
        match over {
            Some(v) if !v.is_empty() => v.clone(),
            _ => base.to_string(),
        }
    }
    Preferences {
        email: pick(&base.email, layer.email.as_ref()),
        url: pick(&base.url, layer.url.as_ref()),
    }
}

/// Reads and writes remembered preferences for the web front end
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    defaults: Preferences,
}

impl PreferenceStore {
    pub fn new(defaults: Preferences) -> Self {
        Self { defaults }
    }

    /// Server-side seed for the form: cookie values over configured defaults.
    pub fn seed(&self, cookie_header: Option<&str>) -> Preferences {
        merge(&self.defaults, &parse_cookie_header(cookie_header.unwrap_or_default()))
    }

    /// `Set-Cookie` values persisting `prefs` for a year.
    ///
    /// Not HTTP-only: the page script reads them alongside local storage.
    pub fn set_cookie_headers(&self, prefs: &Preferences) -> Vec<String> {
        vec![
            set_cookie(EMAIL_KEY, &prefs.email),
            set_cookie(URL_KEY, &prefs.url),
        ]
    }

    /// Browser half of the store: applies local storage over the server seed
    /// on load and writes every edit back. Expects inputs named `email`/`url`.
    pub fn client_script(&self) -> String {
        format!(
            r#"(function () {{
  var keys = {{ email: "{email}", url: "{url}" }};
  var form = document.querySelector("form[data-prefs]");
  if (!form) return;
  try {{
    Object.keys(keys).forEach(function (field) {{
      var input = form.elements[field];
      var stored = window.localStorage.getItem(keys[field]);
      if (stored && stored !== input.value) input.value = stored;
      var save = function () {{ window.localStorage.setItem(keys[field], input.value); }};
      input.addEventListener("input", save);
      save();
    }});
  }} catch (e) {{}}
}})();"#,
            email = EMAIL_KEY,
            url = URL_KEY
        )
    }
}

fn set_cookie(name: &str, value: &str) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; SameSite=Lax",
        name,
        encode_value(value),
        MAX_AGE_SECS
    )
}

fn encode_value(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn decode_value(raw: &str) -> String {
    // A lone token parses as a key with an empty value
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(k, _)| k.into_owned())
        .unwrap_or_default()
}

/// Pick our two keys out of a `Cookie` request header.
pub fn parse_cookie_header(header: &str) -> PreferenceLayer {
    let mut layer = PreferenceLayer::default();
    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let value = decode_value(value.trim().trim_matches('"'));
        match name.trim() {
            EMAIL_KEY => layer.email = Some(value),
            URL_KEY => layer.url = Some(value),
            _ => {}
        }
    }
    layer
}
