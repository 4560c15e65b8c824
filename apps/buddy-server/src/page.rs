//! Server-rendered HTML for the single-page front end.

pub const TITLE: &str = "Stress Buddy 💔😉";
const CAPTION: &str = "Represented By Abhi BABA👾";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Failure,
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn success(message: impl Into<String>) -> Self { Self { kind: BannerKind::Success, message: message.into() } }
    pub fn failure(message: impl Into<String>) -> Self { Self { kind: BannerKind::Failure, message: message.into() } }
}

#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub status: String,
    pub banner: Option<Banner>,
    pub question: String,
    pub reply: Option<String>,
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

pub fn render_page(view: &PageView) -> String {
    let banner = view
        .banner
        .as_ref()
        .map(|b| {
            let class = match b.kind {
                BannerKind::Success => "success",
                BannerKind::Failure => "failure",
            };
            format!(r#"<div class="banner {class}">{}</div>"#, escape_html(&b.message))
        })
        .unwrap_or_default();
    let reply = view
        .reply
        .as_ref()
        .map(|r| format!(r#"<section class="reply"><h2>Reply</h2><p>{}</p></section>"#, escape_html(r).replace('\n', "<br>")))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 46rem; margin: 2rem auto; padding: 0 1rem; }}
.caption {{ color: #666; margin-top: -0.5rem; }}
.status {{ color: #444; font-size: 0.9rem; }}
.banner {{ padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 0; }}
.success {{ background: #e6f4ea; color: #1e4620; }}
.failure {{ background: #fdecea; color: #611a15; }}
input[type=text] {{ width: 100%; padding: 0.5rem; box-sizing: border-box; }}
.reply p {{ white-space: normal; line-height: 1.5; }}
</style>
</head>
<body>
<h1>{title}</h1>
<p class="caption">{caption}</p>
<p class="status">{status}</p>
{banner}
<form method="post" action="/knowledgebase">
<button type="submit">Create Knowledgebase</button>
</form>
<form method="post" action="/ask">
<label for="question">Say whatever is on your mind 💭</label>
<input type="text" id="question" name="question" value="{question}">
<button type="submit">Send</button>
</form>
{reply}
</body>
</html>
"#,
        title = TITLE,
        caption = CAPTION,
        status = escape_html(&view.status),
        banner = banner,
        question = escape_html(&view.question),
        reply = reply,
    )
}
