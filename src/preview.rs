//! Best-effort inline preview for a pasted source URL.

use url::Url;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogg"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Hosted player that can be framed.
    Embed(String),
    /// Direct media file the browser can play itself.
    Video(String),
    /// Anything else on http(s); shown as a link.
    Link(String),
    None,
}

impl Preview {
    pub fn for_url(raw: &str) -> Self {
        let Ok(url) = Url::parse(raw.trim()) else {
            return Preview::None;
        };
        if url.scheme() != "http" && url.scheme() != "https" {
            return Preview::None;
        }
        if let Some(id) = youtube_id(&url) {
            return Preview::Embed(format!("https://www.youtube.com/embed/{id}"));
        }

        let is_video_file = url
            .path()
            .rsplit_once('.')
            .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_video_file {
            Preview::Video(url.to_string())
        } else {
            Preview::Link(url.to_string())
        }
    }

    pub fn to_html(&self) -> String {
        match self {
            Preview::Embed(src) => format!(
                r#"<iframe src="{}" allow="autoplay; encrypted-media; picture-in-picture" allowfullscreen></iframe>"#,
                escape(src)
            ),
            Preview::Video(src) => format!(r#"<video src="{}" controls></video>"#, escape(src)),
            Preview::Link(href) => {
                let href = escape(href);
                format!(r#"<a href="{href}" target="_blank" rel="noopener">{href}</a>"#)
            }
            Preview::None => String::new(),
        }
    }
}

fn youtube_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("m.").unwrap_or(host);

    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("shorts" | "embed" | "live") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
